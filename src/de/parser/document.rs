//
// Copyright 2020 bplist Developers
//
// Licensed under the Apache License, Version 2.0, <LICENSE-APACHE or
// http://apache.org/licenses/LICENSE-2.0> or the MIT license <LICENSE-MIT or
// http://opensource.org/licenses/MIT>, at your option. This file may not be
// copied, modified, or distributed except according to those terms.
//

//! Parsers for the fixed sections around the object table.

use nom::{
    IResult,
    bytes::complete::tag,
    combinator::{map, map_res},
    number::complete::{be_u8, be_u64},
    sequence::{preceded, tuple},
};

use std::convert::TryFrom;

use crate::de::parser::utils::sized_usize_run;
use crate::document::{
    Header,
    OffsetTable,
    Trailer,
    HEADER_MAGIC_NUMBER,
};

/// Parses the magic number and the two version bytes after it.
pub fn header(input: &[u8]) -> IResult<&[u8], Header> {
    map(
        preceded(tag(HEADER_MAGIC_NUMBER), tuple((be_u8, be_u8))),
        |version| Header { version }
    )(input)
}

/// Returns a parser for `entries` object offsets, each `entry_size` bytes wide.
pub fn offset_table(
    entries: usize,
    entry_size: usize,
) -> impl Fn(&[u8]) -> IResult<&[u8], OffsetTable> {
    sized_usize_run(entries, entry_size)
}

/// A one-byte width field.
fn width(input: &[u8]) -> IResult<&[u8], usize> {
    map(be_u8, usize::from)(input)
}

/// An eight-byte count, index or offset field.
fn position(input: &[u8]) -> IResult<&[u8], usize> {
    map_res(be_u64, usize::try_from)(input)
}

/// Parses the trailer, the last `TRAILER_SIZE` bytes of a document.
pub fn trailer(input: &[u8]) -> IResult<&[u8], Trailer> {
    let (input, (offset_table_entry_size, object_reference_size)) = tuple((width, width))(input)?;
    let (input, (number_of_objects, root_object, offset_table_offset)) =
        tuple((position, position, position))(input)?;
    Ok((input, Trailer {
        offset_table_entry_size,
        object_reference_size,
        number_of_objects,
        root_object,
        offset_table_offset,
    }))
}
