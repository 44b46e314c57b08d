//! Shared helpers for integration tests
//!
//! Builds extractors over in-memory sources and on-disk fixtures.

#![allow(dead_code)]

use assert_fs::prelude::*;
use cursorctx::{Extractor, Grammar, SourceBuffer};

/// Extractor over an in-memory JavaScript source.
pub fn extractor(src: &str) -> Extractor
{
    let grammar = Grammar::javascript().expect("grammar");
    Extractor::new(SourceBuffer::new(src), &grammar).expect("extractor")
}

/// Temp directory holding `name` with `src` as its content.
pub fn fixture(
    name: &str,
    src: &str,
) -> assert_fs::TempDir
{
    let tmp = assert_fs::TempDir::new().expect("tempdir");
    tmp.child(name)
        .write_str(src)
        .expect("write fixture");
    tmp
}

/// True when `[start, end)` begins at column 1 and ends at a line's last column.
pub fn is_line_aligned(
    src: &str,
    start: usize,
    end: usize,
) -> bool
{
    let bytes = src.as_bytes();
    let starts_line = start == 0 || bytes.get(start - 1) == Some(&b'\n');
    let ends_line = end == bytes.len() || matches!(bytes.get(end), Some(b'\n') | Some(b'\r'));

    starts_line && ends_line
}

/// Postman-style script: a helper, a const and two tests.
pub const POSTMAN: &str = "\
const BASE_URL = \"https://api.example.com\";
const TIMEOUT = 500;

function buildUrl(path) {
  return BASE_URL + path;
}

pm.test(\"status is ok\", function () {
  const url = buildUrl(\"/status\");
  pm.expect(url).to.include(\"status\");
});

pm.test(\"responds quickly\", function () {
  pm.expect(pm.response.responseTime).to.be.below(TIMEOUT);
});
";
