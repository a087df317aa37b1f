// Application layer: operator batch jobs and storefront read models

pub mod jobs;
pub mod storefront;
