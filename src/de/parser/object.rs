//
// Copyright 2020 bplist Developers
//
// Licensed under the Apache License, Version 2.0, <LICENSE-APACHE or
// http://apache.org/licenses/LICENSE-2.0> or the MIT license <LICENSE-MIT or
// http://opensource.org/licenses/MIT>, at your option. This file may not be
// copied, modified, or distributed except according to those terms.
//

//! Parsers for the objects of the object table.
//!
//! Each parser checks the marker byte against its format and then reads the
//! payload the marker announces. Lengths of at most `MAX_INLINE_LENGTH` live
//! in the marker itself, longer ones follow it as an integer object.

use ascii::{AsciiStr, AsAsciiStrError};
use nom::{
    IResult,
    branch::alt,
    bytes::complete::take,
    combinator::{map, map_res},
    error::ErrorKind,
    number::complete::{be_u8, be_u16, be_u32, be_i64, be_f32, be_f64},
    sequence::preceded,
};

use std::convert::TryFrom;
use std::string::FromUtf16Error;

use crate::de::parser::utils::{reject, sized_usize_run};
use crate::document::{ObjectFormat, EXTENDED_LENGTH_NIBBLE};

/// Every format a marker byte may announce. The tag bits never overlap.
const FORMATS: [ObjectFormat; 14] = [
    ObjectFormat::Boolean,
    ObjectFormat::Fill,
    ObjectFormat::UInt8,
    ObjectFormat::UInt16,
    ObjectFormat::UInt32,
    ObjectFormat::SInt64,
    ObjectFormat::Float32,
    ObjectFormat::Float64,
    ObjectFormat::Date,
    ObjectFormat::Data,
    ObjectFormat::AsciiString,
    ObjectFormat::Utf16String,
    ObjectFormat::Array,
    ObjectFormat::Dictionary,
];

fn marker_byte(input: &[u8]) -> IResult<&[u8], u8> {
    be_u8(input)
}

/// Returns a parser for a marker byte of `format`, yielding its value bits.
fn marker(format: ObjectFormat) -> impl Fn(&[u8]) -> IResult<&[u8], u8> {
    move |input: &[u8]| {
        let (rest, byte) = marker_byte(input)?;
        if byte & format.tag_mask() == format.tag_bits() {
            Ok((rest, byte & format.value_mask()))
        } else {
            reject(input, ErrorKind::Tag)
        }
    }
}

/// Parses any marker byte into its format and value bits.
pub fn any_marker(input: &[u8]) -> IResult<&[u8], (ObjectFormat, u8)> {
    let (rest, byte) = marker_byte(input)?;
    match FORMATS.iter().find(|format| byte & format.tag_mask() == format.tag_bits()) {
        Some(&format) => Ok((rest, (format, byte & format.value_mask()))),
        None => reject(input, ErrorKind::Alt),
    }
}

/// The value bit of the marker is the boolean.
pub fn boolean(input: &[u8]) -> IResult<&[u8], bool> {
    map(marker(ObjectFormat::Boolean), |bit| bit == 1)(input)
}

pub fn fill(input: &[u8]) -> IResult<&[u8], ()> {
    map(marker(ObjectFormat::Fill), |_| ())(input)
}

pub fn uint8(input: &[u8]) -> IResult<&[u8], u8> {
    preceded(marker(ObjectFormat::UInt8), be_u8)(input)
}

pub fn uint16(input: &[u8]) -> IResult<&[u8], u16> {
    preceded(marker(ObjectFormat::UInt16), be_u16)(input)
}

pub fn uint32(input: &[u8]) -> IResult<&[u8], u32> {
    preceded(marker(ObjectFormat::UInt32), be_u32)(input)
}

/// Eight-byte integers are the only signed ones.
pub fn sint64(input: &[u8]) -> IResult<&[u8], i64> {
    preceded(marker(ObjectFormat::SInt64), be_i64)(input)
}

pub fn float32(input: &[u8]) -> IResult<&[u8], f32> {
    preceded(marker(ObjectFormat::Float32), be_f32)(input)
}

pub fn float64(input: &[u8]) -> IResult<&[u8], f64> {
    preceded(marker(ObjectFormat::Float64), be_f64)(input)
}

/// Parses a date object into seconds since 2001-01-01T00:00:00Z.
pub fn date(input: &[u8]) -> IResult<&[u8], f64> {
    preceded(marker(ObjectFormat::Date), be_f64)(input)
}

/// An integer object of any width, as used for extended lengths.
fn integer(input: &[u8]) -> IResult<&[u8], i64> {
    alt((
        map(uint8, i64::from),
        map(uint16, i64::from),
        map(uint32, i64::from),
        sint64,
    ))(input)
}

/// Returns a parser for a marker of a counted `format` and the element count
/// it announces. Negative extended counts fail to parse.
fn counted(format: ObjectFormat) -> impl Fn(&[u8]) -> IResult<&[u8], usize> {
    move |input: &[u8]| {
        let (rest, nibble) = marker(format)(input)?;
        if nibble == EXTENDED_LENGTH_NIBBLE {
            map_res(integer, usize::try_from)(rest)
        } else {
            Ok((rest, usize::from(nibble)))
        }
    }
}

/// Parses a data object into a slice of the input.
pub fn data(input: &[u8]) -> IResult<&[u8], &[u8]> {
    let (input, length) = counted(ObjectFormat::Data)(input)?;
    take(length)(input)
}

fn ascii(bytes: &[u8]) -> Result<&str, AsAsciiStrError> {
    AsciiStr::from_ascii(bytes).map(AsciiStr::as_str)
}

/// Parses an ASCII string object without copying it.
pub fn ascii_string(input: &[u8]) -> IResult<&[u8], &str> {
    let (input, length) = counted(ObjectFormat::AsciiString)(input)?;
    map_res(take(length), ascii)(input)
}

fn utf16(bytes: &[u8]) -> Result<String, FromUtf16Error> {
    let units = bytes.chunks_exact(2)
        .map(|pair| u16::from_be_bytes([pair[0], pair[1]]))
        .collect::<Vec<u16>>();
    String::from_utf16(&units)
}

/// Parses a UTF-16 string object. Its count is in code units, not bytes.
pub fn utf16_string(input: &[u8]) -> IResult<&[u8], String> {
    let (input, units) = counted(ObjectFormat::Utf16String)(input)?;
    match units.checked_mul(2) {
        Some(length) => map_res(take(length), utf16)(input),
        None => reject(input, ErrorKind::TooLarge),
    }
}

/// Returns a parser for an array whose element references are
/// `object_reference_size` bytes wide.
pub fn array(
    object_reference_size: usize
) -> impl Fn(&[u8]) -> IResult<&[u8], Vec<usize>> {
    move |input: &[u8]| {
        let (input, count) = counted(ObjectFormat::Array)(input)?;
        sized_usize_run(count, object_reference_size)(input)
    }
}

/// Returns a parser for a dictionary, yielding `(key, value)` reference pairs.
///
/// The encoding stores every key reference before the first value reference.
pub fn dictionary(
    object_reference_size: usize
) -> impl Fn(&[u8]) -> IResult<&[u8], Vec<(usize, usize)>> {
    move |input: &[u8]| {
        let (input, count) = counted(ObjectFormat::Dictionary)(input)?;
        let (input, keys) = sized_usize_run(count, object_reference_size)(input)?;
        let (input, values) = sized_usize_run(count, object_reference_size)(input)?;
        Ok((input, keys.into_iter().zip(values).collect()))
    }
}
