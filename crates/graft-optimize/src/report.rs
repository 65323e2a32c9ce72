use graft_core::diagnostics::Diagnostic;
use graft_core::error::Result;
use graft_core::intrinsics::MethodSignature;
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum LoweringDecision {
    /// Replaced by a guarded snippet instantiation.
    LoweredToSnippet,
    /// Left as (or restored to) an ordinary call.
    OrdinaryCall,
    /// The native entry is missing; the ordinary call was restored.
    DescriptorUnavailable,
}

impl LoweringDecision {
    pub fn code(self) -> &'static str {
        match self {
            LoweringDecision::LoweredToSnippet => "lowered-to-snippet",
            LoweringDecision::OrdinaryCall => "ordinary-call",
            LoweringDecision::DescriptorUnavailable => "descriptor-unavailable",
        }
    }
}

/// One decision taken for one recognised call site.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LoweringEvent {
    /// Method being compiled.
    pub method: MethodSignature,
    /// Recognised callee at the call site.
    pub target: MethodSignature,
    pub decision: LoweringDecision,
    pub reason: String,
}

impl LoweringEvent {
    pub fn new(
        method: &MethodSignature,
        target: &MethodSignature,
        decision: LoweringDecision,
        reason: impl Into<String>,
    ) -> Self {
        Self {
            method: method.clone(),
            target: target.clone(),
            decision,
            reason: reason.into(),
        }
    }

    pub fn log(&self) {
        match self.decision {
            LoweringDecision::LoweredToSnippet => tracing::debug!(
                method = %self.method,
                target = %self.target,
                decision = self.decision.code(),
                reason = %self.reason,
                "intrinsic lowered"
            ),
            LoweringDecision::OrdinaryCall | LoweringDecision::DescriptorUnavailable => {
                tracing::info!(
                    method = %self.method,
                    target = %self.target,
                    decision = self.decision.code(),
                    reason = %self.reason,
                    "intrinsic fell back to ordinary call"
                )
            }
        }
    }

    pub fn to_diagnostic(&self) -> Diagnostic {
        let message = format!("{} in {}: {}", self.target, self.method, self.reason);
        let diagnostic = match self.decision {
            LoweringDecision::LoweredToSnippet => Diagnostic::info(message),
            LoweringDecision::OrdinaryCall => Diagnostic::info(message),
            LoweringDecision::DescriptorUnavailable => Diagnostic::warning(message),
        };
        diagnostic.with_code(self.decision.code())
    }
}

/// Decisions collected while compiling one method.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct LoweringReport {
    pub events: Vec<LoweringEvent>,
}

impl LoweringReport {
    pub fn push(&mut self, event: LoweringEvent) {
        event.log();
        self.events.push(event);
    }

    pub fn extend(&mut self, other: LoweringReport) {
        self.events.extend(other.events);
    }

    pub fn count(&self, decision: LoweringDecision) -> usize {
        self.events
            .iter()
            .filter(|event| event.decision == decision)
            .count()
    }

    pub fn diagnostics(&self) -> Vec<Diagnostic> {
        self.events.iter().map(LoweringEvent::to_diagnostic).collect()
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(&self.events)?)
    }
}
