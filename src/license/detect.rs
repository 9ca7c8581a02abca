//! License file text classification.

use std::path::{Path, PathBuf};

const LICENSE_FILES: &[&str] = &[
    "LICENSE",
    "LICENSE.md",
    "LICENSE.txt",
    "LICENCE",
    "LICENCE.md",
    "COPYING",
    "license",
    "license.md",
];

/// SPDX identifier of a well-known license text, matched on its
/// distinctive wording. Line wrapping and case are ignored.
pub fn detect_text(text: &str) -> Option<&'static str> {
    let text = text
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase();
    let has = |needle: &str| text.contains(needle);

    // GNU texts cross-reference each other; the title comes first.
    let gnu = [
        ("gnu affero general public license", "agpl"),
        ("gnu lesser general public license", "lgpl"),
        ("gnu general public license", "gpl"),
    ]
    .into_iter()
    .filter_map(|(title, family)| text.find(title).map(|at| (at, family)))
    .min();
    match gnu {
        Some((_, "agpl")) => return Some("AGPL-3.0"),
        Some((_, "lgpl")) => {
            return Some(if has("version 2.1") { "LGPL-2.1" } else { "LGPL-3.0" })
        }
        Some(_) => return Some(if has("version 3") { "GPL-3.0" } else { "GPL-2.0" }),
        None => {}
    }
    if has("mozilla public license") && (has("version 2.0") || has("v. 2.0")) {
        return Some("MPL-2.0");
    }
    if has("apache license") && has("version 2.0") {
        return Some("Apache-2.0");
    }
    if has("boost software license") {
        return Some("BSL-1.0");
    }
    if has("this is free and unencumbered software released into the public domain") {
        return Some("Unlicense");
    }
    if has("permission is hereby granted, free of charge") {
        return Some("MIT");
    }
    if has("permission to use, copy, modify, and/or distribute this software for any purpose") {
        return Some("ISC");
    }
    if has("redistribution and use in source and binary forms") {
        return Some(if has("neither the name") || has("may be used to endorse") {
            "BSD-3-Clause"
        } else {
            "BSD-2-Clause"
        });
    }
    None
}

/// First conventional license file in `dir`.
pub fn find_license_file(dir: &Path) -> Option<PathBuf> {
    LICENSE_FILES
        .iter()
        .map(|name| dir.join(name))
        .find(|path| path.is_file())
}

/// Classify the license file shipped in `dir`, if any.
pub fn detect_in_dir(dir: &Path) -> Option<&'static str> {
    let path = find_license_file(dir)?;
    let text = std::fs::read_to_string(&path).ok()?;
    let detected = detect_text(&text);
    tracing::trace!(path = %path.display(), ?detected, "classified license file");
    detected
}
