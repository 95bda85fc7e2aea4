mod collection;
mod error;
mod store;

pub mod prelude {
    pub use crate::store::MongoStore;
}
