//! Concrete families built on top of the generic engine. Each submodule
//! supplies a field block and an [`crate::nla::NlaMap`]; the decode/encode
//! walk itself lives in [`crate::message`] and [`crate::nla`].

pub mod control;
pub mod generic;
pub mod messaging;
