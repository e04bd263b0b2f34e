//
// Copyright 2020 bplist Developers
//
// Licensed under the Apache License, Version 2.0, <LICENSE-APACHE or
// http://apache.org/licenses/LICENSE-2.0> or the MIT license <LICENSE-MIT or
// http://opensource.org/licenses/MIT>, at your option. This file may not be
// copied, modified, or distributed except according to those terms.
//

//! Big-endian unsigned integers whose width is decided at run time.
//!
//! The trailer picks how many bytes each offset and object reference takes,
//! so every width seen here comes from the document and is checked per call.

use nom::{
    IResult,
    bytes::complete::take,
    error::{ErrorKind, ParseError},
};

use std::convert::TryFrom;
use std::ops::RangeInclusive;

/// Byte widths a sized integer may have.
pub const WIDTHS: RangeInclusive<usize> = 1 ..= 8;

/// Fails the current parser with `kind` at `input`.
pub fn reject<T>(input: &[u8], kind: ErrorKind) -> IResult<&[u8], T> {
    Err(nom::Err::Error(ParseError::from_error_kind(input, kind)))
}

fn take_exact(length: usize, input: &[u8]) -> IResult<&[u8], &[u8]> {
    take(length)(input)
}

/// Folds up to eight big-endian bytes into an integer.
fn fold_be(bytes: &[u8]) -> u64 {
    bytes.iter().fold(0, |value, byte| (value << 8) | u64::from(*byte))
}

/// Returns a parser for an unsigned integer `width` bytes wide.
pub fn sized_u64(width: usize) -> impl Fn(&[u8]) -> IResult<&[u8], u64> {
    move |input: &[u8]| {
        if !WIDTHS.contains(&width) {
            return reject(input, ErrorKind::Verify);
        }
        let (rest, bytes) = take_exact(width, input)?;
        Ok((rest, fold_be(bytes)))
    }
}

/// Returns a parser for an offset or index `width` bytes wide.
///
/// Values which do not fit the platform's `usize` fail to parse.
pub fn sized_usize(width: usize) -> impl Fn(&[u8]) -> IResult<&[u8], usize> {
    move |input: &[u8]| {
        let (rest, value) = sized_u64(width)(input)?;
        match usize::try_from(value) {
            Ok(value) => Ok((rest, value)),
            Err(_) => reject(input, ErrorKind::TooLarge),
        }
    }
}

/// Returns a parser for `count` consecutive indices, each `width` bytes wide.
///
/// Nothing is allocated until the input is known to hold every index, so a
/// forged count fails instead of reserving memory.
pub fn sized_usize_run(count: usize, width: usize) -> impl Fn(&[u8]) -> IResult<&[u8], Vec<usize>> {
    move |input: &[u8]| {
        if !WIDTHS.contains(&width) {
            return reject(input, ErrorKind::Verify);
        }
        let length = match count.checked_mul(width) {
            Some(length) => length,
            None => return reject(input, ErrorKind::TooLarge),
        };
        let (rest, mut bytes) = take_exact(length, input)?;
        let mut indices = Vec::with_capacity(count);
        while !bytes.is_empty() {
            let (remaining, index) = sized_usize(width)(bytes)?;
            indices.push(index);
            bytes = remaining;
        }
        Ok((rest, indices))
    }
}
