pub mod collect;
pub mod dispatch;
