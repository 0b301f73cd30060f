//! Simulation configuration from TOML files

use anyhow::Result;
use chipsim::prelude::*;
use std::io::Write;

fn nested_library() -> Result<ChipLibrary> {
    Ok(ChipLibrary::new()
        .with(ChipDescription::new("INNER").with_sub_chip("NOT", 0))?
        .with(ChipDescription::new("MIDDLE").with_sub_chip("INNER", 0))?
        .with(ChipDescription::new("OUTER").with_sub_chip("MIDDLE", 0))?
        .with(ChipDescription::new("LEAF").with_sub_chip("AND", 0))?)
}

#[test]
fn test_nesting_limit_from_file() -> Result<()> {
    let mut file = tempfile::NamedTempFile::new()?;
    writeln!(file, "max_nesting_depth = 2")?;
    writeln!(file, "trace_floating_inputs = true")?;
    let config = SimulationConfig::from_path(file.path())?;
    assert!(config.trace_floating_inputs);

    let err = Simulator::new(nested_library()?, "OUTER", config.clone())
        .err()
        .unwrap();
    assert!(matches!(
        err,
        SimulationError::Netlist(NetlistError::NestingTooDeep { limit: 2, .. })
    ));

    let mut sim = Simulator::new(nested_library()?, "MIDDLE", config)?;
    sim.step(&[], SimTime::new(0.0, 0))?;
    assert_eq!(sim.last_report().floating_inputs, 1);

    // Growing past the limit through a live edit is rejected too
    let err = sim
        .add_chip(&[ChipId(0)], &SubChipDescription::new("LEAF", 1))
        .unwrap_err();
    assert!(matches!(
        err,
        SimulationError::Netlist(NetlistError::NestingTooDeep { .. })
    ));
    Ok(())
}

#[test]
fn test_malformed_config() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("chipsim.toml");
    std::fs::write(&path, "max_nesting_depth = [1, 2]")?;
    assert!(matches!(
        SimulationConfig::from_path(&path),
        Err(SimulationError::Config(_))
    ));
    Ok(())
}
