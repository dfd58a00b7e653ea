//! Profile domain — model, resolution, and provisioning.

pub mod model;
pub mod provisioner;
pub mod resolver;

pub use model::{
    CompanyChanges, CompanyRecord, NewCompany, NewStudent, ProfileKind, ProfileRow, ProfileView,
    Project, StudentChanges, StudentRecord,
};
pub use provisioner::RoleProvisioner;
pub use resolver::ProfileResolver;
