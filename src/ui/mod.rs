/// UI module exports

pub mod components;
pub mod my_list;
pub mod popup;
