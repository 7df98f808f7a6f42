// Copyright (c) 2019 Georg Brandl.  Licensed under the Apache License,
// Version 2.0 <LICENSE-APACHE or http://www.apache.org/licenses/LICENSE-2.0>
// or the MIT license <LICENSE-MIT or http://opensource.org/licenses/MIT>, at
// your option. This file may not be copied, modified, or distributed except
// according to those terms.

use ngcvm::{Command, Dialect, ErrorKind, GCodeParser, IgnorePolicy, Machine, ParserConfig,
            Renderer, Token, TokenData};

fn parse_all(config: ParserConfig, src: &str) -> (Vec<Token>, Option<u32>) {
    let mut machine = Machine::new();
    let mut parser = GCodeParser::new(&mut machine, config);
    for line in src.lines() {
        parser.parse(line).unwrap();
    }
    let tokens = parser.into_tokens();
    (tokens, machine.inferred_precision())
}

fn render(src: &str) -> String {
    let (tokens, precision) = parse_all(ParserConfig::default(), src);
    Renderer::new(&Machine::new()).with_precision(precision).render_program(&tokens)
}

fn error_kind(config: ParserConfig, src: &str) -> ErrorKind {
    let mut machine = Machine::new();
    let mut parser = GCodeParser::new(&mut machine, config);
    let mut lines = src.lines().peekable();
    while let Some(line) = lines.next() {
        let result = parser.parse(line);
        if lines.peek().is_none() {
            return result.unwrap_err().kind;
        }
        result.unwrap();
    }
    panic!("no lines given");
}

#[test]
fn test_parse() {
    let src = r#"; Try to exercise the syntax.
G21 G90 f100 (set up)
/G1 X1 0(a)(b) Y2.5(a);rest
n10 G0 Z[1+2]
#1=5 #<de pth>=-1.5
G1 X#1 Z#<depth>
G2 X15 Y2.5 I5 J0
"#;

    let rendered = r#"(Trytoexercisethesyntax.)
(setup)F100G21G90
(a)(b)(a)(rest)G1X10Y2.5
G0Z3
G1X5Z-1.5
G2X15Y2.5I5J0
"#;

    assert_eq!(render(src), rendered);
    // rendering is a fixed point
    assert_eq!(render(rendered), rendered);
}

#[test]
fn test_line_numbers() {
    let mut machine = Machine::new();
    let mut parser = GCodeParser::new(&mut machine, ParserConfig::default());
    parser.parse("G0 X1").unwrap();
    parser.parse("").unwrap();
    let block = parser.parse("G0 Y1").unwrap();
    assert_eq!(block.line, 3);
    assert_eq!(parser.tokens()[1].line, 3);
    let err = parser.parse("G0 G1 X1").unwrap_err();
    assert_eq!(err.line, 4);
    assert_eq!(err.key(), "ParserModalGrpError");
    assert!(err.message(Dialect::Grbl).starts_with("error:21 - "));
    assert!(!err.message(Dialect::LinuxCnc).starts_with("error:"));
}

#[test]
fn test_modal_conflict() {
    let cfg = ParserConfig::default;
    assert_eq!(error_kind(cfg(), "G0 G1 X1"), ErrorKind::ParserModalGrpError);
    assert_eq!(error_kind(cfg(), "G90 G91"), ErrorKind::ParserModalGrpError);
    assert_eq!(error_kind(cfg(), "G20 G21"), ErrorKind::ParserModalGrpError);
    assert_eq!(error_kind(cfg(), "M3 M4"), ErrorKind::ParserModalGrpError);
    assert_eq!(error_kind(cfg(), "M7 M9"), ErrorKind::ParserModalGrpError);
    assert_eq!(error_kind(cfg(), "M100 M101"), ErrorKind::ParserModalGrpError);
    assert_eq!(error_kind(cfg(), "G10 L20 P1 X0 G92 Y0"), ErrorKind::ParserModalGrpError);
    assert_eq!(error_kind(cfg(), "G0 X1 G92 Y2"), ErrorKind::ParserAxisError);
}

#[test]
fn test_word_repeat() {
    assert_eq!(error_kind(ParserConfig::default(), "G0 X1 X2"), ErrorKind::ParserWordRepeated);
    assert_eq!(error_kind(ParserConfig::default(), "F1 F2"), ErrorKind::ParserWordRepeated);
}

#[test]
fn test_invalid() {
    for snippet in &[
        "$",            // invalid characters
        "GG",           // missing values
        "O10",          // O-words are unsupported
        "(",            // unclosed comments
        "G[TEST[x]]",   // invalid function
        "#1.2=5",       // fractional parameter number
        "#1=EXISTS[5]", // invalid EXISTS argument
        "#1",           // assignment without value
        "G1.25",        // too many decimals
        "G12",          // unknown code
        "G80 X1",       // axis words without motion
        "G1 X1",        // no feed rate
        "G2 X1 Y1 F100", // neither center nor radius
        "G4",           // dwell without time
        "M61",          // set tool without number
        "G43.1",        // dynamic offset without axes
    ] {
        let mut machine = Machine::new();
        let mut parser = GCodeParser::new(&mut machine, ParserConfig::default());
        assert!(parser.parse(snippet).is_err(), "{} parsed", snippet);
        assert!(parser.tokens().is_empty());
    }
}

#[test]
fn test_block_atomicity() {
    let mut machine = Machine::new();
    let mut parser = GCodeParser::new(&mut machine, ParserConfig::default());
    parser.parse("G0 X1").unwrap();
    assert!(parser.parse("G91 G0 X5 G2").is_err());
    // the G91 was rolled back
    parser.parse("G0 X2").unwrap();
    assert_eq!(parser.machine().position()[0], 2.);
    // parameter assignments stay
    assert!(parser.parse("#1=7 G0 G1").is_err());
    parser.parse("G0 X#1").unwrap();
    assert_eq!(parser.machine().position()[0], 7.);
}

#[test]
fn test_units_idempotence() {
    let src = "G20\nG0 X1.5 Y-0.25\nG21\nG0 X10\n";
    assert_eq!(render(src), src.replace(' ', ""));
    assert_eq!(render(&render(src)), render(src));

    let (tokens, _) = parse_all(ParserConfig::default(), "G20 G0 X1");
    assert_eq!(tokens[1].command, Command::G0);
    assert_eq!(tokens[1].axes().unwrap().get(0), Some(25.4));
}

#[test]
fn test_precision() {
    // inferred from the first X word, at least the unit default
    assert_eq!(render("G0 X1.12345 Y1.123456789\n"), "G0X1.12345Y1.12346\n");
    assert_eq!(render("G0 X1.5 Y1.123456789\n"), "G0X1.5Y1.123\n");
}

#[test]
fn test_order_of_execution() {
    let (tokens, _) = parse_all(ParserConfig::new(Dialect::LinuxCnc),
                                "M30 G1 X1 F200 S1000 T2 M3 M8 G4 P1 G17 G54 G64 Q0.01 (c)");
    let commands: Vec<_> = tokens.iter().map(|t| t.command).collect();
    assert_eq!(commands, [
        Command::Comment, Command::Feedrate, Command::SpindleRpm, Command::ToolSelect,
        Command::M3, Command::M8, Command::G4, Command::G17, Command::G54, Command::G64,
        Command::G1, Command::M30,
    ]);
    assert_eq!(tokens[6].data, TokenData::Dwell(1.));
    assert_eq!(tokens[9].data, TokenData::PathBlend { p: None, q: Some(0.01) });
}

#[test]
fn test_dialects() {
    assert_eq!(error_kind(ParserConfig::new(Dialect::Grbl), "G5 I1 J1 P1 Q1 X1 Y1 F1"),
               ErrorKind::ParserUnsupportedCmd);
    assert_eq!(error_kind(ParserConfig::default(), "G64"), ErrorKind::ParserUnsupportedCmd);
    assert_eq!(error_kind(ParserConfig::new(Dialect::LinuxCnc), "G51 P2"),
               ErrorKind::ParserUnsupportedCmd);
    assert_eq!(error_kind(ParserConfig::new(Dialect::Grbl), "G10 L1 P1 Z1"),
               ErrorKind::ParserUnsupportedCmd);
    let (tokens, _) = parse_all(ParserConfig::new(Dialect::LinuxCnc), "G10 L1 P1 Z1 R2");
    assert_eq!(tokens.len(), 1);
}

#[test]
fn test_strip_policies() {
    let config = ParserConfig { ignore_m6: IgnorePolicy::Strip, ..Default::default() };
    let mut machine = Machine::new();
    let mut parser = GCodeParser::new(&mut machine, config);
    let block = parser.parse("T1 M6").unwrap();
    assert_eq!(block.spliced_code(), "T1");
    assert_eq!(parser.tokens().len(), 1);
    assert_eq!(parser.tokens()[0].command, Command::ToolSelect);

    let config = ParserConfig { ignore_m8: IgnorePolicy::Prompt, ..Default::default() };
    let mut machine = Machine::new();
    let mut asked = Vec::new();
    let mut parser = GCodeParser::new(&mut machine, config)
        .with_prompt(|code: &str, line: usize| { asked.push((code.to_string(), line)); false });
    parser.parse("M8").unwrap();
    assert_eq!(parser.tokens()[0].command, Command::M8);
    drop(parser);
    assert_eq!(asked, [("M8".to_string(), 1)]);
}

#[test]
fn test_block_delete() {
    let config = ParserConfig { block_delete: true, ..Default::default() };
    let mut machine = Machine::new();
    let mut parser = GCodeParser::new(&mut machine, config);
    assert!(parser.parse("/G0 X1").unwrap().skipped);
    assert!(parser.parse("%").unwrap().skipped);
    assert!(parser.tokens().is_empty());
    parser.parse("G0 X1").unwrap();
    assert_eq!(parser.tokens().len(), 1);
}

#[test]
fn test_canned_cycle_words() {
    let (tokens, _) = parse_all(ParserConfig::default(),
                                "G0 Z5\nG81 X1 Y1 Z-2 R1 F100\nX2\nG82 X3 Z-3 P0.5\nG80");
    match &tokens[2].data {
        TokenData::Drill { axes, r, l, .. } => {
            assert_eq!(axes.get(2), Some(-2.));
            assert_eq!(*r, 1.);
            assert_eq!(*l, 1);
        }
        other => panic!("unexpected {:?}", other),
    }
    // sticky Z and R
    match &tokens[3].data {
        TokenData::Drill { axes, r, .. } => {
            assert_eq!(axes.get(0), Some(2.));
            assert_eq!(axes.get(2), Some(-2.));
            assert_eq!(*r, 1.);
        }
        other => panic!("unexpected {:?}", other),
    }
    assert_eq!(tokens[4].command, Command::G82);
    assert_eq!(tokens[5].command, Command::G80);
    assert_eq!(error_kind(ParserConfig::default(), "G82 X1 Z-1 R1 F10"),
               ErrorKind::CycleWordMissing);
    assert_eq!(error_kind(ParserConfig::default(), "G83 X1 Z-1 R1 Q0 F10"),
               ErrorKind::CycleWordInvalid);
}

#[test]
fn test_arc_errors() {
    let cfg = ParserConfig::default;
    assert_eq!(error_kind(cfg(), "G2 X1 Y1 I1 K1 F10"), ErrorKind::ParserArcError);
    assert_eq!(error_kind(cfg(), "G2 X1 Y1 I1 R1 F10"), ErrorKind::ParserArcError);
    assert_eq!(error_kind(cfg(), "G2 Z1 R1 F10"), ErrorKind::ParserArcError);
    assert_eq!(error_kind(cfg(), "G18\nG5 X1 Y1 I1 J1 P1 Q1 F10"), ErrorKind::ParserPlaneError);
    assert_eq!(error_kind(cfg(), "G17\nG76 P1 Z-10 I-1 J0.1 K1"), ErrorKind::ParserPlaneError);
}
