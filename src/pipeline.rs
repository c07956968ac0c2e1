//! Pipeline selection and output assembly.
//!
//! The task type picks an ordered list of module generators:
//!
//! | task      | blocks                                                                   |
//! |-----------|--------------------------------------------------------------------------|
//! | energy    | COMPASS, XUANYUAN, SCF, [MP2]                                            |
//! | tddft     | COMPASS, XUANYUAN, SCF, [MP2], TDDFT (one, or singlet + triplet)         |
//! | optimize  | COMPASS, BDFOPT, XUANYUAN, SCF, [MP2], [TDDFT], RESP                     |
//! | frequency | COMPASS, BDFOPT (Hess only), XUANYUAN, SCF, [MP2], [TDDFT], RESP         |
//!
//! Optimizations and frequencies become excited-state calculations when
//! `settings.tddft` is present. Block order is part of the output format.

use crate::blocks::bdfopt::{self, BdfoptParams};
use crate::blocks::resp::{self, RespParams, EXCITED_METHOD};
use crate::blocks::tddft::{self, TddftParams};
use crate::blocks::{compass, mp2, scf, xuanyuan};
use crate::config::{TaskDescriptor, TaskType};
use crate::error::CompileError;
use crate::keywords::{ModuleBlock, SectionExt};
use crate::normalize::boolish;
use log::debug;
use serde_json::{json, Map, Value};

/// Hessian mode forced for frequency tasks.
pub const FREQUENCY_HESSIAN_MODE: &str = "only";
/// Storage slot for excitations read back by RESP.
pub const EXCITED_ISTORE: i64 = 1;
/// Storage slot of the triplet branch in a spin-orbit run.
pub const TRIPLET_ISTORE: i64 = 2;
/// Excited state followed when `settings.tddft.target_root` is absent.
pub const DEFAULT_TARGET_ROOT: i64 = 1;

/// Compiles a task descriptor into the complete input text.
///
/// # Errors
///
/// Any [`CompileError`] raised by pipeline selection or a generator. No
/// partial output is produced.
pub fn compile(descriptor: &TaskDescriptor) -> Result<String, CompileError> {
    let blocks = build_blocks(descriptor)?;
    Ok(assemble(&blocks))
}

/// Joins rendered blocks with one blank line between them.
pub fn assemble(blocks: &[ModuleBlock]) -> String {
    let mut text = blocks
        .iter()
        .map(ModuleBlock::render)
        .collect::<Vec<_>>()
        .join("\n\n");
    text.push('\n');
    text
}

/// Runs the pipeline for the task type and returns the blocks in output order.
pub fn build_blocks(descriptor: &TaskDescriptor) -> Result<Vec<ModuleBlock>, CompileError> {
    debug!("selecting pipeline for task type '{}'", descriptor.task.task_type);
    if soc_requested(descriptor) {
        return Err(spin_orbit_unsupported(descriptor));
    }

    let blocks = match &descriptor.task.task_type {
        TaskType::Energy => energy(descriptor)?,
        TaskType::Tddft => excitation(descriptor)?,
        TaskType::Optimize => optimize(descriptor)?,
        TaskType::Frequency => frequency(descriptor)?,
        TaskType::Other(name) => {
            return Err(CompileError::NotImplemented(format!("task type '{}'", name)))
        }
    };
    debug!(
        "pipeline produced {}",
        blocks.iter().map(ModuleBlock::name).collect::<Vec<_>>().join(" -> ")
    );
    Ok(blocks)
}

/// COMPASS, XUANYUAN, SCF and the optional MP2.
fn ground_state(descriptor: &TaskDescriptor, blocks: &mut Vec<ModuleBlock>) -> Result<(), CompileError> {
    blocks.push(xuanyuan::generate(descriptor));
    blocks.push(scf::generate(descriptor)?);
    if descriptor.settings.has_section("mp2") {
        blocks.push(mp2::generate(descriptor));
    }
    Ok(())
}

fn energy(descriptor: &TaskDescriptor) -> Result<Vec<ModuleBlock>, CompileError> {
    let mut blocks = vec![compass::generate(descriptor)?];
    ground_state(descriptor, &mut blocks)?;
    Ok(blocks)
}

fn excitation(descriptor: &TaskDescriptor) -> Result<Vec<ModuleBlock>, CompileError> {
    let mut blocks = energy(descriptor)?;
    let settings = descriptor.settings.section("tddft");

    if is_present(settings.get("singlet")) && is_present(settings.get("triplet")) {
        debug!("singlet and triplet TDDFT branches");
        blocks.push(tddft::generate(
            descriptor,
            &TddftParams::branch(0, None, branch_overrides(settings, "singlet")),
        ));
        blocks.push(tddft::generate(
            descriptor,
            &TddftParams::branch(1, None, branch_overrides(settings, "triplet")),
        ));
    } else {
        blocks.push(tddft::generate(descriptor, &TddftParams::default()));
    }
    Ok(blocks)
}

fn optimize(descriptor: &TaskDescriptor) -> Result<Vec<ModuleBlock>, CompileError> {
    let excited = is_excited(descriptor);
    let final_hessian = bdfopt::configured_hessian_mode(descriptor)
        .is_some_and(|mode| mode.split('+').any(|part| part.trim() == "final"));

    let mut blocks = vec![
        compass::generate(descriptor)?,
        bdfopt::generate(descriptor, &BdfoptParams::default()),
    ];
    ground_state(descriptor, &mut blocks)?;
    if excited {
        blocks.push(excited_state_block(descriptor));
    }
    blocks.push(resp::generate(
        descriptor,
        &RespParams {
            norder: final_hessian.then_some(2),
            method: excited.then_some(EXCITED_METHOD),
            nfiles: None,
            iroot: excited.then(|| target_root(descriptor)),
        },
    ));
    Ok(blocks)
}

fn frequency(descriptor: &TaskDescriptor) -> Result<Vec<ModuleBlock>, CompileError> {
    let excited = is_excited(descriptor);
    let forced = BdfoptParams {
        hessian_mode: Some(FREQUENCY_HESSIAN_MODE.to_string()),
    };

    let mut blocks = vec![
        compass::generate(descriptor)?,
        bdfopt::generate(descriptor, &forced),
    ];
    ground_state(descriptor, &mut blocks)?;
    if excited {
        blocks.push(excited_state_block(descriptor));
    }
    blocks.push(resp::generate(
        descriptor,
        &RespParams {
            norder: Some(2),
            method: excited.then_some(EXCITED_METHOD),
            nfiles: excited.then_some(EXCITED_ISTORE),
            iroot: excited.then(|| target_root(descriptor)),
        },
    ));
    Ok(blocks)
}

/// TDDFT block whose excitations are stored for the RESP module.
fn excited_state_block(descriptor: &TaskDescriptor) -> ModuleBlock {
    let params = TddftParams {
        istore: Some(EXCITED_ISTORE),
        ..TddftParams::default()
    };
    tddft::generate(descriptor, &params)
}

fn is_excited(descriptor: &TaskDescriptor) -> bool {
    descriptor.settings.has_section("tddft")
}

fn is_present(value: Option<&Value>) -> bool {
    !matches!(value, None | Some(Value::Null) | Some(Value::Bool(false)))
}

/// The `singlet`/`triplet` sub-mapping, or nothing when it is a bare flag.
fn branch_overrides(settings: &Map<String, Value>, branch: &str) -> Map<String, Value> {
    settings.mapping(branch).cloned().unwrap_or_default()
}

/// `settings.tddft.target_root`, defaulting to the first excited state.
fn target_root(descriptor: &TaskDescriptor) -> Value {
    descriptor
        .settings
        .section("tddft")
        .first_of(&["target_root"])
        .cloned()
        .unwrap_or_else(|| json!(DEFAULT_TARGET_ROOT))
}

/// True for `tddft.soc: true` or `tddft.soc.enabled: true`.
pub fn soc_requested(descriptor: &TaskDescriptor) -> bool {
    match descriptor.settings.section("tddft").get("soc") {
        Some(Value::Object(soc)) => soc.flag("enabled"),
        Some(other) => boolish(other),
        None => false,
    }
}

/// Spin-orbit TDDFT needs a singlet branch (isf 0, istore 1) and a triplet
/// branch (isf 1, istore 2) plus a coupling step that is not generated.
fn spin_orbit_unsupported(descriptor: &TaskDescriptor) -> CompileError {
    debug!(
        "spin-orbit TDDFT requested for '{}': singlet istore {}, triplet istore {}",
        descriptor.task.task_type, EXCITED_ISTORE, TRIPLET_ISTORE
    );
    CompileError::NotImplemented(
        "TDDFT with spin-orbit coupling (settings.tddft.soc)".to_string(),
    )
}
