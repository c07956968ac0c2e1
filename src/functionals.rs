//! Reference data for exchange-correlation functionals.
//!
//! Used for two things only: soft validation (unknown names produce
//! warnings, never errors) and the range-separation default in XUANYUAN.
//! Names are compared case-insensitively; nothing here renames user input.

use crate::config::Functional;
use crate::normalize::functional_components;

/// Version of the functional tables below.
pub const FUNCTIONAL_TABLE_VERSION: u32 = 1;

/// Functionals and functional components the target program is known to accept.
pub const KNOWN_FUNCTIONALS: &[&str] = &[
    // LDA / GGA components
    "svwn", "svwn5", "slater", "vwn", "vwn5", "pw92", "b88", "lyp", "p86", "pw91", "pbe",
    "blyp", "bp86", "bpw91", "olyp", "pbesol", "revpbe", "rpbe", "b97-d",
    // meta-GGA
    "tpss", "m06-l", "mn15-l", "scan", "r2scan", "revtpss",
    // global hybrids
    "b3lyp", "b3pw91", "b3p86", "x3lyp", "o3lyp", "pbe0", "pbe50", "bhhlyp", "bhandhlyp",
    "tpssh", "m05", "m05-2x", "m06", "m06-2x", "m06-hf", "m08-hx", "mn15", "pw6b95",
    "b97", "b98",
    // range-separated hybrids
    "cam-b3lyp", "lc-blyp", "lc-pbe", "lc-wpbe", "lc-wpbeh", "lc-b3lyp", "wb97", "wb97x",
    "wb97x-d", "wb97x-v", "cam-qtp01",
    // double hybrids
    "b2plyp", "b2gpplyp", "dsd-blyp", "pwpb95",
    // Hartree-Fock exchange
    "hf",
];

/// Range-separated functional families.
pub const RANGE_SEPARATED_FUNCTIONALS: &[&str] = &[
    "cam-b3lyp",
    "lc-blyp",
    "lc-pbe",
    "lc-wpbe",
    "lc-wpbeh",
    "lc-b3lyp",
    "wb97",
    "wb97x",
    "wb97x-d",
    "wb97x-v",
    "cam-qtp01",
];

/// Literature range-separation parameter for CAM-B3LYP.
pub const CAM_B3LYP_RS: f64 = 0.33;

/// True when `name` is a range-separated functional.
pub fn is_range_separated(name: &str) -> bool {
    let lower = name.trim().to_ascii_lowercase();
    RANGE_SEPARATED_FUNCTIONALS.contains(&lower.as_str())
}

/// Default range-separation parameter for a functional, if one is known.
///
/// Only CAM-B3LYP has a default; other range-separated functionals return
/// `None` and rely on the target program's built-in value.
pub fn default_range_separation(name: &str) -> Option<f64> {
    if name.trim().eq_ignore_ascii_case("cam-b3lyp") {
        Some(CAM_B3LYP_RS)
    } else {
        None
    }
}

/// Checks each component of a functional against [`KNOWN_FUNCTIONALS`] and
/// returns one warning per unknown component.
pub fn check_functional(functional: &Functional) -> Vec<String> {
    functional_components(functional)
        .into_iter()
        .filter(|part| !KNOWN_FUNCTIONALS.contains(&part.to_ascii_lowercase().as_str()))
        .map(|part| {
            format!(
                "functional '{}' is not in the reference functional list; it will be passed through unchanged",
                part
            )
        })
        .collect()
}
