mod common;

mod bulk;
