// Copyright (c) 2019 Georg Brandl.  Licensed under the Apache License,
// Version 2.0 <LICENSE-APACHE or http://www.apache.org/licenses/LICENSE-2.0>
// or the MIT license <LICENSE-MIT or http://opensource.org/licenses/MIT>, at
// your option. This file may not be copied, modified, or distributed except
// according to those terms.

use ngcvm::{Command, ControllerSnapshot, EmulationIssue, ErrorKind, ErrorPolicy, Machine,
            ParserConfig, Point3, Program, Shape};

/// An owned copy of the interesting parts of a run action.
#[derive(Debug)]
struct Move {
    command: Command,
    start: Point3,
    end: Point3,
    shape: Shape,
    rapid: bool,
    retract: bool,
    synced: bool,
    machine_coord: bool,
}

fn run(src: &str) -> (Vec<Move>, Vec<EmulationIssue>, [f64; 6]) {
    let program = Program::load(src, &ControllerSnapshot::default(), &ParserConfig::default(),
                                ErrorPolicy::Abort).unwrap();
    let mut machine = Machine::new();
    let mut emulator = program.emulate(&mut machine);
    let moves = (&mut emulator).map(|a| Move {
        command: a.token.command,
        start: a.start,
        end: a.end,
        shape: a.shape,
        rapid: a.is_rapid,
        retract: a.is_retract,
        synced: a.is_spindle_synced,
        machine_coord: a.is_in_machine_coord,
    }).collect();
    let position = emulator.machine().machine_position();
    (moves, emulator.into_issues(), position)
}

fn assert_close(a: f64, b: f64) {
    assert!((a - b).abs() < 1e-6, "{} != {}", a, b);
}

#[test]
fn test_incremental_equivalence() {
    let (abs, _, _) = run("G90\nG0 X1 Y2\nG1 X4 Y6 F100\nG1 Z-1.5\nG2 X8 Y6 I2 J0");
    let (inc, _, _) = run("G91\nG0 X1 Y2\nG1 X3 Y4 F100\nG1 Z-1.5\nG2 X4 Y0 I2 J0");
    assert_eq!(abs.len(), 4);
    assert_eq!(abs.len(), inc.len());
    for (a, b) in abs.iter().zip(&inc) {
        assert_eq!(a.end, b.end);
        assert_eq!(a.shape, b.shape);
    }
    assert_eq!(abs[3].end, Point3::new(8., 6., -1.5));
    assert_eq!(abs[3].shape, Shape::Arc {
        center: Point3::new(6., 6., -1.5), radius: 2., clockwise: true,
        plane: ngcvm::machine::Plane::XY, turns: 1,
    });
}

#[test]
fn test_units() {
    let (moves, _, _) = run("G20 G0 X1\nG21 G0 Y1");
    assert_eq!(moves[0].end, Point3::new(25.4, 0., 0.));
    assert_eq!(moves[1].end, Point3::new(25.4, 1., 0.));
}

#[test]
fn test_drill_repeats() {
    let (moves, issues, _) = run("G0 X0 Y0 Z10\nG91\nG81 X5 Y0 Z-3 R-8 L3 F100");
    assert!(issues.is_empty());
    let drill: Vec<_> = moves.iter().filter(|m| m.command == Command::G81).collect();
    // per repeat: XY rapid, rapid down to R, feed down, retract
    assert_eq!(drill.len(), 12);
    let plunges: Vec<_> = drill.iter().filter(|m| !m.rapid).collect();
    assert_eq!(plunges.len(), 3);
    for (n, plunge) in plunges.iter().enumerate() {
        assert_close(plunge.end.x, 5. * (n + 1) as f64);
        assert_close(plunge.start.z, 2.);
        assert_close(plunge.end.z, -1.);
    }
    let retracts: Vec<_> = drill.iter().filter(|m| m.retract).collect();
    assert_eq!(retracts.len(), 3);
    // G98 (the default) returns to the initial Z
    assert!(retracts.iter().all(|m| m.rapid && m.end.z == 10.));
}

#[test]
fn test_drill_retract_modes() {
    let (moves, _, _) = run("G0 X0 Y0 Z10\nG99 G81 X1 Y1 Z-2 R3 F100\nX2");
    let retracts: Vec<_> = moves.iter().filter(|m| m.retract).collect();
    assert_eq!(retracts.len(), 2);
    assert!(retracts.iter().all(|m| m.end.z == 3.));

    // below the R plane: rapid up to R first
    let (moves, _, _) = run("G0 X0 Y0 Z-5\nG98 G81 X1 Y1 Z-8 R2 F100");
    assert_eq!(moves[1].end, Point3::new(0., 0., 2.));
    assert!(moves[1].rapid);
    assert_close(moves.last().unwrap().end.z, 2.);

    // G85 feeds out
    let (moves, _, _) = run("G0 Z5\nG85 X1 Z-1 R1 F100");
    let retract = moves.iter().find(|m| m.retract).unwrap();
    assert!(!retract.rapid);
}

#[test]
fn test_threading_passes() {
    let (moves, issues, _) = run("G18\nG0 X10 Z0\nG76 P1.5 Z-20 I-1 J0.1 K1");
    assert!(issues.is_empty());
    let thread: Vec<_> = moves.iter().filter(|m| m.command == Command::G76).collect();
    let passes = thread.iter().filter(|m| m.retract).count();
    // ceil(K / J) for a degression of 1
    assert_eq!(passes, 10);
    let cuts: Vec<_> = thread.iter().filter(|m| m.synced).collect();
    assert_eq!(cuts.len(), 10);
    assert_close(cuts[0].end.x, 8.9);
    assert_close(cuts[9].end.x, 8.);
    assert!(cuts.iter().all(|m| m.end.z == -20.));
    // back at the start
    assert_eq!(thread.last().unwrap().end, Point3::new(10., 0., 0.));

    let (moves, _, _) = run("G18\nG0 X10 Z0\nG76 P1.5 Z-20 I-1 J0.1 K1 H2");
    assert_eq!(moves.iter().filter(|m| m.retract).count(), 12);
}

#[test]
fn test_threading_tapers() {
    let (moves, _, _) = run("G18\nG0 X10 Z0\nG76 P1.5 Z-20 I1 J0.5 K1 E2 L3");
    let synced: Vec<_> = moves.iter().filter(|m| m.synced).collect();
    // two passes, each with entry taper, cut and exit taper
    assert_eq!(synced.len(), 6);
    assert_close(synced[0].end.z, -2.);
    assert_close(synced[0].end.x, 11.5);
    assert_close(synced[1].end.z, -18.);
    assert_close(synced[2].end.x, 11.);
    assert_close(synced[2].end.z, -20.);
}

#[test]
fn test_scaling() {
    let (moves, _, _) = run("G51 X2 Y2 Z2\nG0 X5 Y5\nG50\nG0 X5 Y5");
    assert_eq!(moves[0].end, Point3::new(10., 10., 0.));
    assert_eq!(moves[1].end, Point3::new(5., 5., 0.));
}

#[test]
fn test_machine_coordinates() {
    let (moves, _, position) = run("G10 L2 P1 X10\nG53 G0 X0\nG0 X1");
    assert!(moves[0].machine_coord);
    assert_eq!(moves[0].end.x, 0.);
    assert!(!moves[1].machine_coord);
    assert_eq!(moves[1].start.x, -10.);
    assert_eq!(moves[1].end.x, 1.);
    assert_eq!(position[0], 11.);
}

#[test]
fn test_g92_offset() {
    let (moves, _, position) = run("G0 X10\nG92 X0\nG0 X5\nG92.1\nG0 X5");
    assert_eq!(moves.len(), 3);
    assert_eq!(moves[1].start.x, 0.);
    assert_eq!(moves[1].end.x, 5.);
    assert_eq!(moves[2].start.x, 15.);
    assert_eq!(position[0], 5.);
}

#[test]
fn test_arc_problems() {
    let (moves, issues, _) = run("G0 X0 Y0\nG2 X10 Y0 R2 F100\nG3 X0 Y0 R5");
    assert_eq!(issues.len(), 1);
    assert_eq!(issues[0].line, 2);
    assert_eq!(issues[0].command, Command::G2);
    assert_eq!(moves[1].shape, Shape::Line);
    assert_eq!(moves[1].end, Point3::new(10., 0., 0.));
    match moves[2].shape {
        Shape::Arc { center, radius, clockwise, .. } => {
            assert_close(center.x, 5.);
            assert_close(center.y, 0.);
            assert_close(radius, 5.);
            assert!(!clockwise);
        }
        other => panic!("unexpected shape {:?}", other),
    }
}

#[test]
fn test_splines() {
    let (moves, issues, _) = run("G0 X0 Y0\nG5 X10 Y0 I2 J5 P-2 Q5 F100\nG5 X20 Y0 P-2 Q-5\nG5.1 X30 I5 J5");
    assert!(issues.is_empty());
    match moves[2].shape {
        // continues tangentially from the last P/Q
        Shape::Spline { controls } => assert_eq!(controls[1], Point3::new(12., -5., 0.)),
        other => panic!("unexpected shape {:?}", other),
    }
    match moves[3].shape {
        Shape::Spline { controls } => {
            assert_eq!(controls[0], Point3::new(20., 0., 0.));
            assert_eq!(controls[3], Point3::new(30., 0., 0.));
        }
        other => panic!("unexpected shape {:?}", other),
    }
}

#[test]
fn test_probe() {
    let program = Program::load("G38.2 Z-10 F100", &ControllerSnapshot::default(),
                                &ParserConfig::default(), ErrorPolicy::Abort).unwrap();
    let mut machine = Machine::new();
    assert_eq!(program.emulate(&mut machine).count(), 1);
    assert!(machine.probe().success);
    assert_eq!(machine.probe().position[2], -10.);
    // emulating again starts from the snapshot
    assert_eq!(program.emulate(&mut machine).count(), 1);
    assert_eq!(machine.position()[2], -10.);
}

#[test]
fn test_threading_pass_limit() {
    // degression R2 squares the pass count
    let (moves, _, _) = run("G18\nG0 X10 Z0\nG76 P1.5 Z-20 I-1 J0.1 K1 R2");
    assert_eq!(moves.iter().filter(|m| m.retract).count(), 100);

    for src in &["G18\nG0 X10 Z0\nG76 P1 Z-10 I-1 J0.1 K1 R100",
                 "G18\nG0 X10 Z0\nG76 P1 Z-10 I-1 J0.1 K1 H20000"] {
        let err = Program::load(src, &ControllerSnapshot::default(), &ParserConfig::default(),
                                ErrorPolicy::Abort).unwrap_err();
        assert_eq!(err.kind, ErrorKind::CycleWordInvalid);
        assert_eq!(err.line, 3);
    }
}

#[test]
fn test_drill_r_plane_rounding() {
    // 0.2 + 0.1 - 0.1 is not exactly 0.2
    let (moves, _, _) = run("G10 L2 P1 Z0.1\nG0 X0 Y0 Z-1\nG81 X1 Y0 Z-2 R0.2 F100");
    let drill: Vec<_> = moves.iter().filter(|m| m.command == Command::G81).collect();
    // up to R, over to XY, feed down, retract
    assert_eq!(drill.len(), 4);
    assert!(drill.iter().all(|m| m.start != m.end));
}

#[test]
fn test_predefined_positions() {
    // through the given point, then all axes to the stored position
    let (moves, _, position) = run("G0 X3 Y4 Z5\nG28.1\nG0 X0 Y0 Z0\nG28 Z10");
    assert_eq!(moves.len(), 4);
    assert_eq!(moves[2].end, Point3::new(0., 0., 10.));
    assert!(moves[2].rapid && !moves[2].machine_coord);
    assert_eq!(moves[3].start, Point3::new(0., 0., 10.));
    assert_eq!(moves[3].end, Point3::new(3., 4., 5.));
    assert!(moves[3].rapid && moves[3].machine_coord);
    assert_eq!(position, [3., 4., 5., 0., 0., 0.]);

    // without axis words there is no intermediate move
    let (moves, _, position) = run("G0 X1 Y2 Z3\nG30.1\nG0 X0 Y0 Z0\nG30");
    assert_eq!(moves.len(), 3);
    assert_eq!(moves[2].command, Command::G30);
    assert_eq!(moves[2].end, Point3::new(1., 2., 3.));
    assert_eq!(position[..3], [1., 2., 3.]);

    let (moves, _, position) = run("G30.1\nG0 X5 Y5\nG30 X6");
    assert_eq!(moves[1].end, Point3::new(6., 5., 0.));
    assert_eq!(moves[2].end, Point3::new(0., 0., 0.));
    assert_eq!(position[..3], [0., 0., 0.]);

    // stored positions read back as parameters
    let (moves, _, _) = run("G0 X3 Y4\nG28.1\nG0 X1 Y2\nG30.1\nG0 X#5161 Y#5182");
    assert_eq!(moves.last().unwrap().end, Point3::new(3., 2., 0.));
}
