pub mod br_docs;
pub mod db_utils;
