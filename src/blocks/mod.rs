//! Module block generators.
//!
//! Each generator reads the whole [`TaskDescriptor`](crate::config::TaskDescriptor)
//! and returns one [`ModuleBlock`](crate::keywords::ModuleBlock). Generators
//! never modify the descriptor; per-call variations (TDDFT spin branches, a
//! forced Hessian mode) are passed as explicit parameters or override
//! mappings.

pub mod bdfopt;
pub mod compass;
pub mod mp2;
pub mod resp;
pub mod scf;
pub mod tddft;
pub mod xuanyuan;

#[cfg(test)]
pub(crate) mod test_support {
    use crate::config::TaskDescriptor;
    use serde_json::Value;

    pub fn descriptor(value: Value) -> TaskDescriptor {
        serde_json::from_value(value).expect("test descriptor should deserialize")
    }
}
