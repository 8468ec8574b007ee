//! Common helpers for end-to-end tests.

use crate::catalog::ColumnSchema;
use crate::coerce::{CoercionMode, NullPolicy};
use crate::fixture::FixtureSource;
use crate::mismatch::MismatchCase;
use crate::payload::EntryPoint;
use crate::scenario::{Scenario, ScenarioError, ScenarioReport, ScenarioRunner};
use crate::session::RemoteSession;
use crate::simulation::MemoryEngine;
use crate::testing;
use crate::types::{DeviceId, SemanticType};

pub use crate::testing::{all_types_schema, device};

/// A session over a fresh in-memory engine.
pub struct TestHarness {
    pub session: RemoteSession<MemoryEngine>,
}

impl TestHarness {
    #[must_use]
    pub fn new() -> Self {
        Self {
            session: testing::new_test_session(),
        }
    }

    pub fn engine(&self) -> &MemoryEngine {
        self.session.transport()
    }

    pub fn run(
        &mut self,
        scenario: &Scenario,
        fixture: &FixtureSource,
    ) -> Result<ScenarioReport, ScenarioError> {
        ScenarioRunner::new(&mut self.session).run(scenario, fixture)
    }

    pub fn run_with_capacity(
        &mut self,
        capacity: usize,
        scenario: &Scenario,
        fixture: &FixtureSource,
    ) -> Result<ScenarioReport, ScenarioError> {
        ScenarioRunner::new(&mut self.session)
            .with_tablet_capacity(capacity)
            .run(scenario, fixture)
    }

    pub fn run_negative(
        &mut self,
        device: &DeviceId,
        entry_point: EntryPoint,
        case: &MismatchCase,
    ) -> Result<(), ScenarioError> {
        ScenarioRunner::new(&mut self.session).run_negative(device, entry_point, case)
    }
}

/// A scenario with the default null policy.
pub fn scenario(
    device_path: &str,
    schema: ColumnSchema,
    entry_point: EntryPoint,
    mode: CoercionMode,
) -> Scenario {
    Scenario {
        device: device(device_path),
        schema,
        entry_point,
        mode,
        null_policy: NullPolicy::Substitute,
    }
}

pub fn boolean_schema() -> ColumnSchema {
    ColumnSchema::single("s1", SemanticType::Boolean)
}

/// A fixture over `all_types_schema()` with every kind of field, one
/// partially-null row and one all-null row.
pub fn all_types_fixture() -> FixtureSource {
    FixtureSource::from_text(
        "Time,boolean,int32,int64,timestamp,float,double,text,string,blob,date\n\
         1,true,42,9000000000,1700000000000,1.5,2.25,hello,world,abc,2024-06-01\n\
         2,false,-7,-1,0,0.125,-3.5,a b,c d,xyz,1999-12-31\n\
         3,null,1,null,5,null,1.0,null,s,null,2000-02-29\n\
         4,null,null,null,null,null,null,null,null,null,null\n",
    )
}

/// The entry points that accept `mode`.
pub fn entry_points_for(mode: CoercionMode) -> impl Iterator<Item = EntryPoint> {
    EntryPoint::ALL.into_iter().filter(move |e| e.supports(mode))
}
