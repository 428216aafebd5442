pub use entity_api::user::{
    create, find_by_email, find_by_id, AuthSession, Backend, Credentials, Role,
};
