pub mod embedding_helper;
