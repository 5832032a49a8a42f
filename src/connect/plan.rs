//! Connection plans and the planner that builds them.

use std::path::PathBuf;

use tracing::{info, warn};

use crate::credential::{Credential, CredentialResolver, PromptError, Prompter};
use crate::registry::{Registry, RegistryError, TargetRecord};
use crate::secret::SecretBackend;

/// A target together with its resolved credential.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoint {
    pub target: TargetRecord,
    pub credential: Credential,
}

impl Endpoint {
    /// Returns the target id.
    #[must_use]
    pub fn id(&self) -> &str {
        &self.target.id
    }

    /// Returns the normalized host address.
    #[must_use]
    pub fn host(&self) -> &str {
        self.target.address()
    }
}

/// How the destination is reached.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Via {
    Direct(Endpoint),
    /// Relayed through a single jump host.
    Jump { jump: Endpoint, target: Endpoint },
}

impl Via {
    /// Returns the final destination.
    #[must_use]
    pub fn destination(&self) -> &Endpoint {
        match self {
            Self::Direct(target) | Self::Jump { target, .. } => target,
        }
    }

    /// Returns the jump host, if any.
    #[must_use]
    pub fn jump(&self) -> Option<&Endpoint> {
        match self {
            Self::Direct(_) => None,
            Self::Jump { jump, .. } => Some(jump),
        }
    }
}

/// Direction of a file transfer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransferDirection {
    /// Local file to the destination.
    Upload,
    /// Destination file to a local path.
    Download,
}

/// A file transfer against the destination.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferRequest {
    pub direction: TransferDirection,
    pub local: PathBuf,
    pub remote: String,
}

impl TransferRequest {
    #[must_use]
    pub fn upload(local: impl Into<PathBuf>, remote: impl Into<String>) -> Self {
        Self {
            direction: TransferDirection::Upload,
            local: local.into(),
            remote: remote.into(),
        }
    }

    #[must_use]
    pub fn download(remote: impl Into<String>, local: impl Into<PathBuf>) -> Self {
        Self {
            direction: TransferDirection::Download,
            local: local.into(),
            remote: remote.into(),
        }
    }
}

/// One unit of external-process work.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Step {
    Transfer(TransferRequest),
    Interactive,
}

/// Ordered steps over one resolved route. Immutable once built.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectionPlan {
    via: Via,
    steps: Vec<Step>,
}

impl ConnectionPlan {
    #[must_use]
    pub fn via(&self) -> &Via {
        &self.via
    }

    #[must_use]
    pub fn steps(&self) -> &[Step] {
        &self.steps
    }
}

/// What to plan.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlanRequest {
    pub target_id: String,
    pub jump_id: Option<String>,
    pub transfer: Option<TransferRequest>,
}

/// Records taking part in a plan, looked up before any credential work.
#[derive(Debug, Clone, Copy)]
pub struct Lookup<'r> {
    pub target: &'r TargetRecord,
    pub jump: Option<&'r TargetRecord>,
}

impl<'r> Lookup<'r> {
    /// Returns true if any record resolves through the secret manager.
    #[must_use]
    pub fn needs_secrets(&self) -> bool {
        self.target.secret_ref().is_some() || self.jump.is_some_and(|j| j.secret_ref().is_some())
    }
}

/// Builds connection plans from registry targets.
#[derive(Debug, Clone, Copy)]
pub struct Planner<'r> {
    registry: &'r Registry,
}

impl<'r> Planner<'r> {
    #[must_use]
    pub fn new(registry: &'r Registry) -> Self {
        Self { registry }
    }

    /// Looks up the target and jump records.
    ///
    /// # Errors
    /// Returns `NotFound` for an unknown target or jump id.
    pub fn lookup(&self, request: &PlanRequest) -> Result<Lookup<'r>, RegistryError> {
        let target = self.registry.find(&request.target_id)?;
        let jump = match request.jump_id.as_deref() {
            Some(jump_id) if jump_id == target.id => {
                warn!("Jump host '{}' is the target itself, connecting directly", jump_id);
                None
            }
            Some(jump_id) => Some(self.registry.find(jump_id)?),
            None => None,
        };
        Ok(Lookup { target, jump })
    }

    /// Resolves credentials for looked-up records and builds the plan.
    ///
    /// The jump host's credential is resolved first, independently of
    /// the destination's.
    pub fn build<B, P>(
        &self,
        lookup: &Lookup<'_>,
        transfer: Option<TransferRequest>,
        resolver: &mut CredentialResolver<'_, B, P>,
    ) -> Result<ConnectionPlan, PromptError>
    where
        B: SecretBackend,
        P: Prompter + ?Sized,
    {
        let jump = match lookup.jump {
            Some(record) => Some(Endpoint {
                credential: resolver.resolve(record)?,
                target: record.clone(),
            }),
            None => None,
        };
        let target = Endpoint {
            credential: resolver.resolve(lookup.target)?,
            target: lookup.target.clone(),
        };

        let via = match jump {
            Some(jump) => Via::Jump { jump, target },
            None => Via::Direct(target),
        };

        let steps = match transfer {
            Some(transfer) if transfer.direction == TransferDirection::Download => {
                vec![Step::Transfer(transfer)]
            }
            Some(transfer) => vec![Step::Transfer(transfer), Step::Interactive],
            None => vec![Step::Interactive],
        };

        info!(
            "Planned {} step(s) to '{}'{}",
            steps.len(),
            via.destination().id(),
            via.jump()
                .map(|j| format!(" via '{}'", j.id()))
                .unwrap_or_default()
        );
        Ok(ConnectionPlan { via, steps })
    }

    /// Looks up, resolves and plans in one go.
    pub fn plan<B, P>(
        &self,
        request: &PlanRequest,
        resolver: &mut CredentialResolver<'_, B, P>,
    ) -> Result<ConnectionPlan, super::ConnectError>
    where
        B: SecretBackend,
        P: Prompter + ?Sized,
    {
        let lookup = self.lookup(request)?;
        Ok(self.build(&lookup, request.transfer.clone(), resolver)?)
    }
}
