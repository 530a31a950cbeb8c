mod credential;

pub use credential::{Credential, CredentialFamily, CredentialId, CredentialSummary, CredentialType};
