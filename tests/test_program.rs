// Copyright (c) 2019 Georg Brandl.  Licensed under the Apache License,
// Version 2.0 <LICENSE-APACHE or http://www.apache.org/licenses/LICENSE-2.0>
// or the MIT license <LICENSE-MIT or http://opensource.org/licenses/MIT>, at
// your option. This file may not be copied, modified, or distributed except
// according to those terms.

use std::io::Write;

use ngcvm::machine::{CoordSystemId, DistanceMode, Plane, SpindleState, Units};
use ngcvm::program::LoadError;
use ngcvm::{ControllerSnapshot, Dialect, ErrorKind, ErrorPolicy, Machine, ParserConfig, Program,
            Synchronize};

const SNAPSHOT: &str = r#"
machine_position = [10.0, 0.0, 0.0]
tool_length_offset = [0.0, 0.0, 1.5]

[parser_state]
units = "Imperial"
distance = "Incremental"
coord_system = "G55"
feed_rate = 50.0

[[coord_systems]]
id = "G55"
values = [1.0, 2.0, 3.0]

[[tools]]
number = 1
offsets = [0.0, 0.0, 2.0]
radius = 3.0
"#;

fn write_temp(text: &str) -> tempfile::NamedTempFile {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(text.as_bytes()).unwrap();
    file
}

#[test]
fn test_error_policies() {
    let src = "G0 X1\nG0 G1 X2\nG0 X3";
    let program = Program::load(src, &ControllerSnapshot::default(), &ParserConfig::default(),
                                ErrorPolicy::Skip).unwrap();
    assert_eq!(program.tokens().len(), 2);
    assert_eq!(program.blocks().len(), 2);
    assert_eq!(program.errors().len(), 1);
    assert_eq!(program.errors()[0].line, 2);
    assert_eq!(program.errors()[0].kind, ErrorKind::ParserModalGrpError);
    // line numbers of the later blocks are kept
    assert_eq!(program.tokens()[1].line, 3);

    let err = Program::load(src, &ControllerSnapshot::default(), &ParserConfig::default(),
                            ErrorPolicy::Abort).unwrap_err();
    assert_eq!(err.line, 2);
}

#[test]
fn test_load_files() {
    let config = write_temp("dialect = \"linuxcnc\"\nblock_delete = true\n");
    let config = ParserConfig::load(config.path()).unwrap();
    assert_eq!(config.dialect, Dialect::LinuxCnc);

    let snapshot = write_temp(SNAPSHOT);
    let snapshot = ControllerSnapshot::load(snapshot.path()).unwrap();
    assert_eq!(snapshot.parser_state.units, Units::Imperial);
    assert_eq!(snapshot.tools[0].radius, 3.);

    let gcode = write_temp("/G0 X5\nG64 P0.1\nG0 X1\n");
    let program = Program::load_file(gcode.path(), &snapshot, &config, ErrorPolicy::Abort).unwrap();
    // the deleted block leaves only G64 and G0
    assert_eq!(program.tokens().len(), 2);

    assert!(matches!(Program::load_file("/nonexistent/file.ngc", &snapshot, &config,
                                        ErrorPolicy::Abort),
                     Err(LoadError::Io(_))));
    let bad = write_temp("G0 G1 X1\n");
    assert!(matches!(Program::load_file(bad.path(), &snapshot, &config, ErrorPolicy::Abort),
                     Err(LoadError::Parse(_))));
    assert!(ParserConfig::from_toml_str("dialect = \"fanuc\"").is_err());
}

#[test]
fn test_snapshot_state() {
    let snapshot = ControllerSnapshot::from_toml_str(SNAPSHOT).unwrap();
    let program = Program::load("G0 X1\nG43 H1", &snapshot, &ParserConfig::default(),
                                ErrorPolicy::Abort).unwrap();
    let mut machine = Machine::new();
    let actions: Vec<_> = program.emulate(&mut machine)
        .map(|a| (a.start, a.end))
        .collect();
    assert_eq!(actions.len(), 1);
    let (start, end) = actions[0];
    // G55 offset and tool length offset apply from the start
    assert!((start.x - 9.).abs() < 1e-9);
    assert!((start.z + 4.5).abs() < 1e-9);
    // incremental inches
    assert!((end.x - 34.4).abs() < 1e-9);
    assert!((machine.machine_position()[0] - 35.4).abs() < 1e-9);
    assert_eq!(machine.tool_offset()[2], 2.);

    // re-synchronizing restores the snapshot
    machine.sync(&snapshot);
    assert_eq!(machine.machine_position()[0], 10.);
    assert_eq!(machine.tool_offset()[2], 1.5);
    assert_eq!(machine.active_coordinate_system().id, CoordSystemId::G55);
}

#[test]
fn test_snapshot_from_report() {
    let report = "\
[GC:G1 G55 G18 G20 G91 G94 M3 M8 T2 F250 S1200]
[G55:1.000,2.000,3.000]
[TLO:1.500]
[PRB:0.000,0.000,-5.000:1]
ok
";
    let snapshot = ControllerSnapshot::from_report(report).unwrap();
    let state = &snapshot.parser_state;
    assert_eq!(state.motion, 10);
    assert_eq!(state.coord_system, CoordSystemId::G55);
    assert_eq!(state.plane, Plane::XZ);
    assert_eq!(state.units, Units::Imperial);
    assert_eq!(state.distance, DistanceMode::Incremental);
    assert_eq!(state.spindle, SpindleState::Cw);
    assert!(state.coolant.flood && !state.coolant.mist);
    assert_eq!((state.tool, state.feed_rate, state.rpm), (2, 250., 1200.));

    let g55 = snapshot.coord_systems.iter().find(|cs| cs.id == CoordSystemId::G55).unwrap();
    assert_eq!(g55.values, [1., 2., 3., 0., 0., 0.]);
    assert_eq!(snapshot.tool_length_offset, [0., 0., 1.5, 0., 0., 0.]);
    let probe = snapshot.probe.as_ref().unwrap();
    assert!(probe.success);
    assert_eq!(probe.position[2], -5.);

    assert!(ControllerSnapshot::from_report("[GC:G1 X]").is_err());
    assert!(ControllerSnapshot::from_report("[GC]").is_err());
}

#[test]
fn test_render_compression() {
    let program = Program::load("G0 X1 Y1\nG0 X1 Y2\nG0 X1 Y2\nG1 X1 Y2 F100\nG91 G0 X1\nG0 X1",
                                &ControllerSnapshot::default(), &ParserConfig::default(),
                                ErrorPolicy::Abort).unwrap();
    assert_eq!(program.render(true), "G0X1Y1\nG0Y2\nF100\nG91G0X1\nG0X1\n");
    assert_eq!(program.render(false),
               "G0X1Y1\nG0X1Y2\nG0X1Y2\nF100G1X1Y2\nG91G0X1\nG0X1\n");
}
