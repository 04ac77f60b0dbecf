/*!
# clumon DevKit - Test helpers for the status sampler

Makes it easy to exercise the sampler without a real Pacemaker cluster:
- Builder for realistic `crm status` output
- Fake `crm` executables (fixed output, exit codes, hangs, sequences)
*/

pub mod crm_fixtures;
#[cfg(unix)]
pub mod fake_crm;

pub use crm_fixtures::CrmStatusBuilder;
#[cfg(unix)]
pub use fake_crm::FakeCrm;
