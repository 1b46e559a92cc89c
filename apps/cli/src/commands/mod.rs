pub mod bundle;
pub mod completion;
pub mod jvm;
pub mod plist;
