pub mod similarity_group;
