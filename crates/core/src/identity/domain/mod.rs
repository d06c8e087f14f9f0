pub mod embedding_store;
pub mod identity_record;
pub mod similarity_matcher;
