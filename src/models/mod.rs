//! Persisted record types, one module per collection.

pub mod blob;
pub mod company;
pub mod document;
pub mod form;
pub mod response;
pub mod session;
pub mod user;
pub mod workflow;

pub use blob::FileBlob;
pub use company::Company;
pub use document::{ApprovedDocument, ClientSignature, DocumentKind, GeneratedDocument};
pub use form::Form;
pub use response::{Attachment, ChatMessage, FormResponse, ResponseStatus, Submitter};
pub use session::SessionToken;
pub use user::User;
pub use workflow::{TaskNode, WorkflowDocument};

/// Collection names as stored in the persistence layer.
pub mod collections {
    pub const FORMS: &str = "forms";
    pub const RESPONSES: &str = "responses";
    pub const GENERATED_DOCUMENTS: &str = "generated_documents";
    pub const APPROVED_DOCUMENTS: &str = "approved_documents";
    pub const CLIENT_SIGNATURES: &str = "client_signatures";
    pub const WORKFLOWS: &str = "workflows";
    pub const SESSION_TOKENS: &str = "session_tokens";
    pub const USERS: &str = "users";
    pub const COMPANIES: &str = "companies";

    pub const ALL: [&str; 9] = [
        FORMS,
        RESPONSES,
        GENERATED_DOCUMENTS,
        APPROVED_DOCUMENTS,
        CLIENT_SIGNATURES,
        WORKFLOWS,
        SESSION_TOKENS,
        USERS,
        COMPANIES,
    ];
}
