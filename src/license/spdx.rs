use crate::models::LicenseRisk;

/// Risk level of a canonical SPDX identifier.
///
/// `-only` / `-or-later` suffixes and a trailing `+` classify like the bare
/// identifier.
pub fn classify_spdx_id(id: &str) -> LicenseRisk {
    let id = id.trim();
    let base = id
        .strip_suffix("-only")
        .or_else(|| id.strip_suffix("-or-later"))
        .or_else(|| id.strip_suffix('+'))
        .unwrap_or(id);

    match base {
        "MIT" | "MIT-0" | "Apache-2.0" | "BSD-2-Clause" | "BSD-3-Clause" | "BSD-4-Clause"
        | "ISC" | "0BSD" | "Unlicense" | "Zlib" | "CC0-1.0" | "WTFPL" | "CC-BY-3.0"
        | "CC-BY-4.0" | "PSF-2.0" | "Python-2.0" | "BlueOak-1.0.0" | "Artistic-2.0"
        | "BSL-1.0" | "MS-PL" | "Unicode-DFS-2016" | "Unicode-3.0" => LicenseRisk::Permissive,

        "LGPL-2.0" | "LGPL-2.1" | "LGPL-3.0" | "MPL-2.0" | "EUPL-1.2" | "CDDL-1.0"
        | "EPL-1.0" | "EPL-2.0" | "APSL-2.0" | "OSL-3.0" | "MS-RL" => LicenseRisk::WeakCopyleft,

        "GPL-2.0" | "GPL-3.0" | "AGPL-3.0" | "EUPL-1.1" | "SSPL-1.0" => {
            LicenseRisk::StrongCopyleft
        }

        "BUSL-1.1" | "Elastic-2.0" => LicenseRisk::Proprietary,

        _ => LicenseRisk::Unknown,
    }
}

/// Map common non-SPDX spellings (manifest strings, PyPI trove
/// classifiers, NuGet license names) to SPDX identifiers.
///
/// Unrecognized input comes back trimmed and otherwise unchanged.
pub fn normalize(raw: &str) -> String {
    let trimmed = raw.trim();
    let lower = trimmed.to_lowercase();
    let key = lower
        .rsplit(" :: ")
        .next()
        .unwrap_or(&lower)
        .trim_end_matches(" license")
        .to_string();

    let id = match key.as_str() {
        "mit" | "the mit" | "expat" | "mit/x11" => "MIT",
        "apache 2.0" | "apache-2" | "apache 2" | "apache software" | "apache license 2.0"
        | "apache license, version 2.0" | "apache" | "asl 2.0" => "Apache-2.0",
        "bsd" | "new bsd" | "modified bsd" | "bsd 3-clause" | "3-clause bsd" => "BSD-3-Clause",
        "bsd 2-clause" | "simplified bsd" | "2-clause bsd" | "freebsd" => "BSD-2-Clause",
        "isc" | "isc license (iscl)" => "ISC",
        "gnu gpl v2" | "gpl v2" | "gplv2" | "gnu general public license v2 (gplv2)"
        | "gnu general public license v2" => "GPL-2.0",
        "gnu gpl v3" | "gpl v3" | "gplv3" | "gnu general public license v3 (gplv3)"
        | "gnu general public license v3" => "GPL-3.0",
        "gnu lgpl v2.1" | "lgpl v2.1" | "lgplv2.1" => "LGPL-2.1",
        "gnu lgpl v3" | "lgpl v3" | "lgplv3"
        | "gnu lesser general public license v3 (lgplv3)" => "LGPL-3.0",
        "agpl v3" | "agplv3" | "gnu agpl v3"
        | "gnu affero general public license v3" => "AGPL-3.0",
        "mozilla public license 2.0" | "mpl 2.0" | "mplv2"
        | "mozilla public license 2.0 (mpl 2.0)" => "MPL-2.0",
        "cc0" | "public domain" | "cc0 1.0 universal (cc0 1.0) public domain dedication" => {
            "CC0-1.0"
        }
        "the unlicense (unlicense)" | "unlicense" => "Unlicense",
        "python software foundation" => "PSF-2.0",
        "boost software" | "boost" => "BSL-1.0",
        _ => return trimmed.to_string(),
    };
    id.to_string()
}
