// Copyright (c) 2019 Georg Brandl.  Licensed under the Apache License,
// Version 2.0 <LICENSE-APACHE or http://www.apache.org/licenses/LICENSE-2.0>
// or the MIT license <LICENSE-MIT or http://opensource.org/licenses/MIT>, at
// your option. This file may not be copied, modified, or distributed except
// according to those terms.

//! The whitespace and comment pre-pass.
//!
//! A line is split into code (whitespace removed, upper-cased) and comments.
//! The result keeps the original text, so that the parser can describe
//! modifications (stripped codes) as splices over the code text instead of
//! rewriting strings.

use std::ops::Range;
use pest::Parser;
use pest_derive::Parser;

use crate::error::{fail, ErrorKind, GCodeResult};

#[derive(Parser)]
#[grammar = "block.pest"]
struct BlockGrammar;

/// A comment found in a block.
#[derive(Clone, PartialEq, Debug)]
pub struct BlockComment {
    /// Offset in the code text where the comment appeared.
    pub offset: usize,
    /// Comment text without delimiters.  Message comments are kept verbatim,
    /// all others have their whitespace removed.
    pub text: String,
    /// Whether this was a `;` comment.
    pub line_comment: bool,
}

impl BlockComment {
    /// Whether this is a `(MSG,`, `(DEBUG,` or `(PRINT,` comment.
    pub fn is_message(&self) -> bool {
        is_message(&self.text)
    }
}

fn is_message(text: &str) -> bool {
    let upper = text.trim_start().to_ascii_uppercase();
    ["MSG,", "DEBUG,", "PRINT,"].iter().any(|p| upper.starts_with(p))
}

/// Apply the comment text rules.
pub fn clean_comment(text: &str) -> String {
    if is_message(text) {
        text.to_string()
    } else {
        text.chars().filter(|c| !c.is_whitespace()).collect()
    }
}

/// A replacement of a range of the code text.
#[derive(Clone, PartialEq, Debug)]
pub struct Splice {
    pub span: Range<usize>,
    pub replacement: String,
}

/// One line after the pre-pass, plus any modifications made by the parser.
#[derive(Clone, PartialEq, Debug, Default)]
pub struct NormalizedBlock {
    /// Block counter assigned by the parser.
    pub line: usize,
    pub original: String,
    /// Upper-cased code text without whitespace and comments.
    pub code: String,
    pub comments: Vec<BlockComment>,
    /// The line started with the block delete character `/`.
    pub block_delete: bool,
    /// Whether the block was skipped (block delete active, or `%`).
    pub skipped: bool,
    /// Modifications of the code text, ordered by position.
    pub splices: Vec<Splice>,
}

impl NormalizedBlock {
    pub fn new(line: &str) -> GCodeResult<Self> {
        let pairs = match BlockGrammar::parse(Rule::line, line) {
            Ok(pairs) => pairs,
            Err(e) => return fail(ErrorKind::ParserCommentError, e.variant.message().to_string()),
        };
        let mut block = NormalizedBlock { original: line.into(), ..Default::default() };
        for pair in pairs.flatten() {
            match pair.as_rule() {
                Rule::block_delete => block.block_delete = true,
                Rule::code => block.code.push_str(&pair.as_str().to_ascii_uppercase()),
                Rule::comment_text | Rule::line_comment_text => block.comments.push(BlockComment {
                    offset: block.code.len(),
                    text: clean_comment(pair.as_str()),
                    line_comment: pair.as_rule() == Rule::line_comment_text,
                }),
                _ => ()
            }
        }
        Ok(block)
    }

    /// Whether the block contains nothing to parse.
    pub fn is_empty(&self) -> bool {
        self.code.is_empty() && self.comments.is_empty()
    }

    pub fn add_splice(&mut self, span: Range<usize>, replacement: impl Into<String>) {
        let splice = Splice { span, replacement: replacement.into() };
        let pos = self.splices.iter().position(|s| s.span.start > splice.span.start)
            .unwrap_or(self.splices.len());
        self.splices.insert(pos, splice);
    }

    /// The code text with all splices applied.
    pub fn spliced_code(&self) -> String {
        self.render(false)
    }

    /// The normalized line: spliced code with comments at their original
    /// positions.
    pub fn text(&self) -> String {
        self.render(true)
    }

    fn render(&self, with_comments: bool) -> String {
        let mut out = String::with_capacity(self.original.len());
        if self.block_delete && with_comments {
            out.push('/');
        }
        let comments: &[BlockComment] = if with_comments { &self.comments } else { &[] };
        let (mut ci, mut si, mut pos) = (0, 0, 0);
        loop {
            while ci < comments.len() && comments[ci].offset <= pos {
                push_comment(&mut out, &comments[ci]);
                ci += 1;
            }
            if pos >= self.code.len() {
                break;
            }
            if let Some(splice) = self.splices.get(si).filter(|s| s.span.start <= pos) {
                out.push_str(&splice.replacement);
                pos = splice.span.end.max(pos);
                si += 1;
                continue;
            }
            let mut next = self.code.len();
            if let Some(splice) = self.splices.get(si) {
                next = next.min(splice.span.start);
            }
            if let Some(comment) = comments.get(ci) {
                next = next.min(comment.offset);
            }
            out.push_str(&self.code[pos..next]);
            pos = next;
        }
        for comment in &comments[ci..] {
            push_comment(&mut out, comment);
        }
        out
    }
}

fn push_comment(out: &mut String, comment: &BlockComment) {
    if comment.line_comment {
        out.push(';');
        out.push_str(&comment.text);
    } else {
        out.push('(');
        out.push_str(&comment.text);
        out.push(')');
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split() {
        let block = NormalizedBlock::new("g1 x1 0(a b)(MSG, Hello World) y2 ; rest of line").unwrap();
        assert_eq!(block.code, "G1X10Y2");
        assert_eq!(block.comments.len(), 3);
        assert_eq!(block.comments[0].text, "ab");
        assert_eq!(block.comments[0].offset, 5);
        assert_eq!(block.comments[1].text, "MSG, Hello World");
        assert!(block.comments[1].is_message());
        assert!(block.comments[2].line_comment);
        assert_eq!(block.comments[2].text, "restofline");
        assert_eq!(block.text(), "G1X10(ab)(MSG, Hello World)Y2;restofline");
    }

    #[test]
    fn test_block_delete() {
        let block = NormalizedBlock::new("  /G0 X1").unwrap();
        assert!(block.block_delete);
        assert_eq!(block.code, "G0X1");
        assert_eq!(block.text(), "/G0X1");
        assert!(!NormalizedBlock::new("G0 X1").unwrap().block_delete);
    }

    #[test]
    fn test_comment_errors() {
        for line in &["G1 (unclosed", "G1 )", "((nested))"] {
            assert_eq!(NormalizedBlock::new(line).unwrap_err().kind, ErrorKind::ParserCommentError);
        }
    }

    #[test]
    fn test_splices() {
        let mut block = NormalizedBlock::new("G0 X1 M6 T2 (change)").unwrap();
        block.add_splice(4..6, "");
        assert_eq!(block.spliced_code(), "G0X1T2");
        assert_eq!(block.text(), "G0X1T2(change)");
        block.add_splice(0..2, "G1");
        assert_eq!(block.spliced_code(), "G1X1T2");
    }
}
