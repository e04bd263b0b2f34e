//
// Copyright 2020 bplist Developers
//
// Licensed under the Apache License, Version 2.0, <LICENSE-APACHE or
// http://apache.org/licenses/LICENSE-2.0> or the MIT license <LICENSE-MIT or
// http://opensource.org/licenses/MIT>, at your option. This file may not be
// copied, modified, or distributed except according to those terms.
//

//! # Apple plist XML 1.0.
//!
//! The reader walks `quick-xml` events forward only and never resolves the
//! DTD. The writer produces the layout CoreFoundation emits: one element per
//! line, indented with tabs.

mod reader;
mod writer;

pub(crate) use self::reader::XmlReadSession;
pub(crate) use self::writer::XmlWriteSession;

/// The textual form of dates, always in UTC.
pub(crate) const DATE_FORMAT: &str = "%Y-%m-%dT%H:%M:%SZ";

/// Formats a real in its shortest round-trip form.
pub(crate) fn format_real(value: f64) -> String {
    if value.is_nan() {
        String::from("nan")
    } else if value.is_infinite() {
        String::from(if value > 0.0 { "+infinity" } else { "-infinity" })
    } else {
        format!("{}", value)
    }
}
