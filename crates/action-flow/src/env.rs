//! Collaborators shared by the controller and the recovery tiers

use action_locator::SelectorResolver;
use action_primitives::BrowserDriver;
use agent_core::{RemediationAuthor, TaskPlanner, VisionAnalyzer};
use std::sync::Arc;
use surefoot_event_bus::ProgressReporter;

/// Browser driver plus optional model-backed collaborators.
///
/// Every collaborator except the driver is optional; a tier whose collaborator is missing is
/// skipped.
#[derive(Clone)]
pub struct Collaborators {
    pub driver: Arc<dyn BrowserDriver>,
    pub resolver: Option<Arc<SelectorResolver>>,
    pub planner: Option<Arc<dyn TaskPlanner>>,
    pub vision: Option<Arc<dyn VisionAnalyzer>>,
    pub remediation: Option<Arc<dyn RemediationAuthor>>,
    pub reporter: Arc<ProgressReporter>,
}

impl Collaborators {
    pub fn new(driver: Arc<dyn BrowserDriver>) -> Self {
        Self {
            driver,
            resolver: None,
            planner: None,
            vision: None,
            remediation: None,
            reporter: Arc::new(ProgressReporter::new()),
        }
    }

    pub fn with_resolver(mut self, resolver: Arc<SelectorResolver>) -> Self {
        self.resolver = Some(resolver);
        self
    }

    pub fn with_planner(mut self, planner: Arc<dyn TaskPlanner>) -> Self {
        self.planner = Some(planner);
        self
    }

    pub fn with_vision(mut self, vision: Arc<dyn VisionAnalyzer>) -> Self {
        self.vision = Some(vision);
        self
    }

    pub fn with_remediation(mut self, author: Arc<dyn RemediationAuthor>) -> Self {
        self.remediation = Some(author);
        self
    }

    pub fn with_reporter(mut self, reporter: Arc<ProgressReporter>) -> Self {
        self.reporter = reporter;
        self
    }
}
