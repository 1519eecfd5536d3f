pub mod credential_service;
pub mod issuer;
pub mod signer;
pub mod validator;
