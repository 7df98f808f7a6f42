// Copyright (c) 2019 Georg Brandl.  Licensed under the Apache License,
// Version 2.0 <LICENSE-APACHE or http://www.apache.org/licenses/LICENSE-2.0>
// or the MIT license <LICENSE-MIT or http://opensource.org/licenses/MIT>, at
// your option. This file may not be copied, modified, or distributed except
// according to those terms.

//! XML persistence of token lists.
//!
//! The document is a `<tokens>` element with one empty child element per
//! token.  The element name identifies the `TokenData` variant, attributes
//! hold the line, the command and the data fields.  Axis values are stored
//! under their lowercase letter, only for flagged axes.

use std::collections::HashMap;
use std::str::FromStr;

use quick_xml::events::attributes::AttrError;
use quick_xml::events::{BytesEnd, BytesStart, Event};
use quick_xml::{Reader, Writer};
use thiserror::Error;

use crate::axes::{Axes, Axis};
use crate::token::{Command, ThreadParams, Token, TokenData};

#[derive(Debug, Error)]
pub enum XmlError {
    #[error("XML error: {0}")]
    Xml(#[from] quick_xml::Error),
    #[error("XML attribute error: {0}")]
    Attribute(#[from] AttrError),
    #[error("unknown element <{0}>")]
    UnknownElement(String),
    #[error("missing attribute {attr} on <{elem}>")]
    MissingAttribute { elem: String, attr: String },
    #[error("invalid value {value:?} for attribute {attr} on <{elem}>")]
    InvalidValue { elem: String, attr: String, value: String },
}

fn element_name(data: &TokenData) -> &'static str {
    match data {
        TokenData::Modal => "modal",
        TokenData::Comment(_) => "comment",
        TokenData::Value(_) => "value",
        TokenData::Tool(_) => "tool",
        TokenData::Dwell(_) => "dwell",
        TokenData::Word(..) => "word",
        TokenData::Axes(_) => "axes",
        TokenData::MachineMotion { .. } => "machine-motion",
        TokenData::Arc { .. } => "arc",
        TokenData::Spline { .. } => "spline",
        TokenData::SyncMotion { .. } => "sync-motion",
        TokenData::Drill { .. } => "drill",
        TokenData::Thread(_) => "thread",
        TokenData::Offsets { .. } => "offsets",
        TokenData::PathBlend { .. } => "path-blend",
        TokenData::Io { .. } => "io",
        TokenData::UserM { .. } => "user-m",
    }
}

/// Collects the attributes of one element.
struct AttrWriter(Vec<(&'static str, String)>);

impl AttrWriter {
    fn num(&mut self, name: &'static str, value: f64) {
        self.0.push((name, value.to_string()));
    }

    fn int(&mut self, name: &'static str, value: u32) {
        self.0.push((name, value.to_string()));
    }

    fn opt(&mut self, name: &'static str, value: Option<f64>) {
        if let Some(v) = value {
            self.num(name, v);
        }
    }

    fn axes(&mut self, axes: &Axes) {
        const NAMES: [&str; 6] = ["x", "y", "z", "a", "b", "c"];
        for (i, v) in axes.iter() {
            self.num(NAMES[i], v);
        }
    }
}

fn write_data(w: &mut AttrWriter, data: &TokenData) {
    match *data {
        TokenData::Modal => (),
        TokenData::Comment(ref text) => w.0.push(("text", text.clone())),
        TokenData::Value(v) => w.num("value", v),
        TokenData::Tool(n) => w.int("number", n),
        TokenData::Dwell(p) => w.num("seconds", p),
        TokenData::Word(letter, v) => {
            w.0.push(("letter", letter.to_string()));
            w.num("value", v);
        }
        TokenData::Axes(ref axes) => w.axes(axes),
        TokenData::MachineMotion { rapid, ref axes } => {
            w.0.push(("rapid", rapid.to_string()));
            w.axes(axes);
        }
        TokenData::Arc { ref axes, ref ijk, r, turns } => {
            w.axes(axes);
            for (i, v) in ijk.iter() {
                w.num(["i", "j", "k"][i.min(2)], v);
            }
            w.opt("r", r);
            w.int("turns", turns);
        }
        TokenData::Spline { ref axes, i, j, pq } => {
            w.axes(axes);
            w.num("i", i);
            w.num("j", j);
            if let Some((p, q)) = pq {
                w.num("p", p);
                w.num("q", q);
            }
        }
        TokenData::SyncMotion { ref axes, k } => {
            w.axes(axes);
            w.num("k", k);
        }
        TokenData::Drill { ref axes, r, l, p, q } => {
            w.axes(axes);
            w.num("r", r);
            w.int("l", l);
            w.opt("p", p);
            w.opt("q", q);
        }
        TokenData::Thread(ref t) => {
            w.axes(&t.axes);
            w.num("p", t.p);
            w.num("i", t.i);
            w.num("j", t.j);
            w.num("k", t.k);
            w.num("r", t.r);
            w.num("q", t.q);
            w.int("h", t.h);
            w.num("e", t.e);
            w.int("l", t.l);
        }
        TokenData::Offsets { l, p, ref axes, r } => {
            w.int("l", l);
            w.int("p", p);
            w.axes(axes);
            w.opt("r", r);
        }
        TokenData::PathBlend { p, q } => {
            w.opt("p", p);
            w.opt("q", q);
        }
        TokenData::Io { p, e, l, q } => {
            w.opt("p", p);
            w.opt("e", e);
            w.opt("l", l);
            w.opt("q", q);
        }
        TokenData::UserM { code, p, q } => {
            w.int("code", code);
            w.opt("p", p);
            w.opt("q", q);
        }
    }
}

/// Serialize a token list.
pub fn to_xml(tokens: &[Token]) -> Result<String, XmlError> {
    let mut writer = Writer::new_with_indent(Vec::new(), b' ', 2);
    writer.write_event(Event::Start(BytesStart::new("tokens")))?;
    for token in tokens {
        let mut attrs = AttrWriter(vec![("line", token.line.to_string()),
                                        ("command", token.command.to_string())]);
        write_data(&mut attrs, &token.data);
        let mut elem = BytesStart::new(element_name(&token.data));
        for (name, value) in &attrs.0 {
            elem.push_attribute((*name, value.as_str()));
        }
        writer.write_event(Event::Empty(elem))?;
    }
    writer.write_event(Event::End(BytesEnd::new("tokens")))?;
    Ok(String::from_utf8_lossy(&writer.into_inner()).into_owned())
}

/// The attributes of one element, for reading.
struct AttrReader {
    elem: String,
    attrs: HashMap<String, String>,
}

impl AttrReader {
    fn parse<T: FromStr>(&self, name: &str) -> Result<Option<T>, XmlError> {
        match self.attrs.get(name) {
            None => Ok(None),
            Some(value) => value.parse().map(Some).map_err(|_| XmlError::InvalidValue {
                elem: self.elem.clone(), attr: name.into(), value: value.clone(),
            }),
        }
    }

    fn req<T: FromStr>(&self, name: &str) -> Result<T, XmlError> {
        self.parse(name)?.ok_or_else(|| XmlError::MissingAttribute {
            elem: self.elem.clone(), attr: name.into(),
        })
    }

    fn axes(&self) -> Result<Axes, XmlError> {
        let mut axes = Axes::new();
        for axis in Axis::ALL {
            let name = axis.letter().to_ascii_lowercase().to_string();
            if let Some(v) = self.parse(&name)? {
                axes.set(axis.index(), v);
            }
        }
        Ok(axes)
    }

    fn command(&self) -> Result<Command, XmlError> {
        let value: String = self.req("command")?;
        value.parse().map_err(|_| XmlError::InvalidValue {
            elem: self.elem.clone(), attr: "command".into(), value,
        })
    }

    fn data(&self) -> Result<TokenData, XmlError> {
        Ok(match self.elem.as_str() {
            "modal" => TokenData::Modal,
            "comment" => TokenData::Comment(self.req("text")?),
            "value" => TokenData::Value(self.req("value")?),
            "tool" => TokenData::Tool(self.req("number")?),
            "dwell" => TokenData::Dwell(self.req("seconds")?),
            "word" => TokenData::Word(self.req("letter")?, self.req("value")?),
            "axes" => TokenData::Axes(self.axes()?),
            "machine-motion" => TokenData::MachineMotion { rapid: self.req("rapid")?, axes: self.axes()? },
            "arc" => {
                let mut ijk = Axes::new();
                for (i, name) in ["i", "j", "k"].iter().enumerate() {
                    if let Some(v) = self.parse(name)? {
                        ijk.set(i, v);
                    }
                }
                TokenData::Arc { axes: self.axes()?, ijk, r: self.parse("r")?, turns: self.req("turns")? }
            }
            "spline" => {
                let pq = match (self.parse("p")?, self.parse("q")?) {
                    (Some(p), Some(q)) => Some((p, q)),
                    _ => None,
                };
                TokenData::Spline { axes: self.axes()?, i: self.req("i")?, j: self.req("j")?, pq }
            }
            "sync-motion" => TokenData::SyncMotion { axes: self.axes()?, k: self.req("k")? },
            "drill" => TokenData::Drill {
                axes: self.axes()?,
                r: self.req("r")?,
                l: self.req("l")?,
                p: self.parse("p")?,
                q: self.parse("q")?,
            },
            "thread" => TokenData::Thread(ThreadParams {
                axes: self.axes()?,
                p: self.req("p")?,
                i: self.req("i")?,
                j: self.req("j")?,
                k: self.req("k")?,
                r: self.req("r")?,
                q: self.req("q")?,
                h: self.req("h")?,
                e: self.req("e")?,
                l: self.req("l")?,
            }),
            "offsets" => TokenData::Offsets {
                l: self.req("l")?,
                p: self.req("p")?,
                axes: self.axes()?,
                r: self.parse("r")?,
            },
            "path-blend" => TokenData::PathBlend { p: self.parse("p")?, q: self.parse("q")? },
            "io" => TokenData::Io {
                p: self.parse("p")?,
                e: self.parse("e")?,
                l: self.parse("l")?,
                q: self.parse("q")?,
            },
            "user-m" => TokenData::UserM { code: self.req("code")?, p: self.parse("p")?, q: self.parse("q")? },
            other => return Err(XmlError::UnknownElement(other.into())),
        })
    }
}

/// Deserialize a token list written by `to_xml`.
pub fn from_xml(text: &str) -> Result<Vec<Token>, XmlError> {
    let mut reader = Reader::from_str(text);
    reader.trim_text(true);
    let mut tokens = Vec::new();
    loop {
        match reader.read_event()? {
            Event::Empty(elem) | Event::Start(elem) => {
                let name = String::from_utf8_lossy(elem.name().as_ref()).into_owned();
                if name == "tokens" {
                    continue;
                }
                let mut attrs = HashMap::new();
                for attr in elem.attributes() {
                    let attr = attr?;
                    let key = String::from_utf8_lossy(attr.key.as_ref()).into_owned();
                    attrs.insert(key, attr.unescape_value()?.into_owned());
                }
                let reader = AttrReader { elem: name, attrs };
                tokens.push(Token::new(reader.req("line")?, reader.command()?, reader.data()?));
            }
            Event::Eof => break,
            _ => ()
        }
    }
    Ok(tokens)
}
