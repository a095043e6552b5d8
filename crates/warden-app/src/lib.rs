// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

pub mod ids;
pub mod model;
pub mod paging;
pub mod polling;
pub mod state;

pub use ids::*;
pub use model::*;
pub use paging::*;
pub use polling::*;
pub use state::*;
