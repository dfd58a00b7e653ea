//! Directory layer — the persistence seam over the platform's tables.

pub mod applications;
pub mod companies;
pub mod internships;
pub mod memory;
pub mod messages;
pub mod remote;
pub mod students;
pub mod traits;

pub use applications::{Application, ApplicationService, ApplicationStatus, NewApplication};
pub use companies::CompanyService;
pub use internships::{Internship, InternshipFilter, InternshipService, NewInternship};
pub use memory::MemoryDirectory;
pub use messages::{ConversationSummary, Message, MessageService};
pub use remote::RemoteDirectory;
pub use students::StudentService;
pub use traits::Directory;
