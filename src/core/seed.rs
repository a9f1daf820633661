//! Seed runner
//!
//! Seeds populate data. Unlike migrations they have no history: every
//! invocation runs every seed again, in name order.

use super::context::{order_units, ExecutionContext, ProgressFn, UnitFuture};
use super::dialect::Dialect;
use super::driver::Driver;
use super::error::Result;
use super::migration::release;
use async_trait::async_trait;
use tracing::info;

/// A data-population unit
#[async_trait]
pub trait Seed: Send + Sync {
    fn name(&self) -> &str;

    async fn run(&self, ctx: ExecutionContext<'_>) -> Result<()>;
}

type SeedFn = Box<dyn for<'a> Fn(ExecutionContext<'a>) -> UnitFuture<'a> + Send + Sync>;

/// A seed whose body is a closure
pub struct FnSeed {
    name: String,
    run: SeedFn,
}

impl FnSeed {
    pub fn new<F>(name: impl Into<String>, run: F) -> Self
    where
        F: for<'a> Fn(ExecutionContext<'a>) -> UnitFuture<'a> + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            run: Box::new(run),
        }
    }
}

#[async_trait]
impl Seed for FnSeed {
    fn name(&self) -> &str {
        &self.name
    }

    async fn run(&self, ctx: ExecutionContext<'_>) -> Result<()> {
        (self.run)(ctx).await
    }
}

impl std::fmt::Debug for FnSeed {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FnSeed")
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

/// Seeds ordered by name
#[derive(Default)]
pub struct SeedSet {
    units: Vec<Box<dyn Seed>>,
}

impl SeedSet {
    pub fn new(mut units: Vec<Box<dyn Seed>>) -> Result<Self> {
        order_units(&mut units, |s| s.name())?;
        Ok(Self { units })
    }

    pub fn empty() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.units.len()
    }

    pub fn is_empty(&self) -> bool {
        self.units.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &dyn Seed> {
        self.units.iter().map(|s| s.as_ref())
    }

    pub fn names(&self) -> Vec<&str> {
        self.iter().map(|s| s.name()).collect()
    }
}

impl std::fmt::Debug for SeedSet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list().entries(self.names()).finish()
    }
}

/// What a seed invocation did
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SeedReport {
    pub ran: Vec<String>,
}

/// Runs seeds against one driver/dialect pair
pub struct Seeder<'a> {
    ctx: ExecutionContext<'a>,
    progress: Option<ProgressFn<'a>>,
}

impl<'a> Seeder<'a> {
    pub fn new(driver: &'a dyn Driver, dialect: &'a dyn Dialect) -> Self {
        Self {
            ctx: ExecutionContext::new(driver, dialect),
            progress: None,
        }
    }

    /// Receive a line as each seed starts, e.g. `Running seed 001_users...`
    #[must_use]
    pub fn with_progress(mut self, progress: impl Fn(&str) + Send + Sync + 'a) -> Self {
        self.progress = Some(Box::new(progress));
        self
    }

    /// Run every seed in order, stopping at the first failure
    pub async fn run(&self, set: &SeedSet) -> Result<SeedReport> {
        let mut report = SeedReport::default();
        for seed in set.iter() {
            let line = format!("Running seed {}...", seed.name());
            info!("{}", line);
            if let Some(progress) = &self.progress {
                progress(&line);
            }
            seed.run(self.ctx).await?;
            report.ran.push(seed.name().to_string());
        }
        Ok(report)
    }
}

/// Run all seeds, then close the driver
pub async fn seed(driver: &dyn Driver, dialect: &dyn Dialect, set: &SeedSet) -> Result<SeedReport> {
    seed_with(Seeder::new(driver, dialect), set).await
}

/// Run all seeds through a configured seeder, then close its driver
pub async fn seed_with(seeder: Seeder<'_>, set: &SeedSet) -> Result<SeedReport> {
    let outcome = if set.is_empty() {
        info!("No seeders found.");
        Ok(SeedReport::default())
    } else {
        seeder.run(set).await
    };
    release(seeder.ctx.driver(), outcome).await
}
