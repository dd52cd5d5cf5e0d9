// ClubGate
// Copyright (C) 2025 Synerthink

// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.

// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
// GNU Affero General Public License for more details.

// You should have received a copy of the GNU Affero General Public License
// along with this program.  If not, see <http://www.gnu.org/licenses/>.

use super::CommandContext;
use anyhow::{Result, anyhow};
use clubgate::policy::post_login_landing;
use clubgate::{AccessDecision, GuardRequirement, ProfileStatus, Role, Subject, decide};
use serde::Serialize;

#[derive(Debug, Serialize)]
pub struct DecisionReport {
    pub subject: Subject,
    pub requirement: GuardRequirement,
    pub decision: AccessDecision,
    /// Path the visitor is sent to, if any
    pub redirect_to: Option<String>,
    /// Page to open right after sign-in
    pub landing: Option<String>,
}

pub fn run_decide(
    ctx: &CommandContext,
    anonymous: bool,
    profile: Option<&str>,
    role: Option<&str>,
    registration: bool,
    landing: Option<String>,
) -> Result<()> {
    let subject = parse_subject(anonymous, profile)?;
    let requirement = parse_requirement(role, registration, landing)?;
    let report = evaluate(ctx, subject, requirement);

    ctx.emit(&report, |report| {
        println!("Decision: {}", report.decision.label());
        if let Some(target) = &report.redirect_to {
            println!("Redirect: {}", target);
        }
        if let Some(landing) = &report.landing {
            println!("After sign-in: {}", landing);
        }
    })
}

pub fn evaluate(ctx: &CommandContext, subject: Subject, requirement: GuardRequirement) -> DecisionReport {
    let decision = decide(&subject, &requirement);
    let redirect_to = match decision {
        AccessDecision::RedirectTo(destination) => Some(ctx.config.paths.resolve(destination, &requirement).to_string()),
        _ => None,
    };
    let landing = post_login_landing(&subject, &ctx.config.paths).map(str::to_string);

    DecisionReport {
        subject,
        requirement,
        decision,
        redirect_to,
        landing,
    }
}

pub fn parse_subject(anonymous: bool, profile: Option<&str>) -> Result<Subject> {
    if anonymous {
        return Ok(Subject::Anonymous);
    }

    let profile = profile.ok_or_else(|| anyhow!("Pass --anonymous or --profile <admin|club|student|not-found|error>"))?;
    let status = match profile.trim().to_ascii_lowercase().as_str() {
        "not-found" | "none" => ProfileStatus::NotFound,
        "error" | "failed" => ProfileStatus::LookupFailed,
        other => ProfileStatus::Found(other.parse::<Role>()?),
    };
    Ok(Subject::Authenticated(status))
}

pub fn parse_requirement(role: Option<&str>, registration: bool, landing: Option<String>) -> Result<GuardRequirement> {
    let mut requirement = match (role, registration) {
        (Some(_), true) => return Err(anyhow!("A registration route cannot require a role")),
        (Some(role), false) => GuardRequirement::role(role.parse::<Role>()?),
        (None, true) => GuardRequirement::registration(),
        (None, false) => GuardRequirement::registered(),
    };
    requirement.landing = landing;
    Ok(requirement)
}

#[cfg(test)]
mod tests {
    use super::*;
    use clubgate::{Destination, GuardConfig};

    fn ctx() -> CommandContext {
        CommandContext::new(GuardConfig::default(), false)
    }

    #[test]
    fn test_parse_subject() {
        assert_eq!(parse_subject(true, None).unwrap(), Subject::Anonymous);
        assert_eq!(parse_subject(false, Some("Admin")).unwrap(), Subject::Authenticated(ProfileStatus::Found(Role::Admin)));
        assert_eq!(parse_subject(false, Some("not-found")).unwrap(), Subject::Authenticated(ProfileStatus::NotFound));
        assert_eq!(parse_subject(false, Some("error")).unwrap(), Subject::Authenticated(ProfileStatus::LookupFailed));
        assert!(parse_subject(false, Some("superuser")).is_err());
        assert!(parse_subject(false, None).is_err());
    }

    #[test]
    fn test_parse_requirement() {
        assert_eq!(parse_requirement(None, false, None).unwrap(), GuardRequirement::registered());
        assert_eq!(parse_requirement(Some("club"), false, None).unwrap(), GuardRequirement::role(Role::Club));
        assert_eq!(parse_requirement(None, true, None).unwrap(), GuardRequirement::registration());
        assert!(parse_requirement(Some("club"), true, None).is_err());
    }

    #[test]
    fn test_evaluate_reports_paths() {
        let ctx = ctx();

        let report = evaluate(&ctx, Subject::Anonymous, GuardRequirement::registered());
        assert_eq!(report.decision, AccessDecision::RedirectTo(Destination::Login));
        assert_eq!(report.redirect_to.as_deref(), Some("/login"));
        assert_eq!(report.landing.as_deref(), Some("/login"));

        let club = Subject::Authenticated(ProfileStatus::Found(Role::Club));
        let report = evaluate(&ctx, club, GuardRequirement::role(Role::Admin).with_landing("/club-dashboard"));
        assert_eq!(report.redirect_to.as_deref(), Some("/club-dashboard"));
        assert_eq!(report.landing.as_deref(), Some("/club-dashboard"));

        let failed = Subject::Authenticated(ProfileStatus::LookupFailed);
        let report = evaluate(&ctx, failed, GuardRequirement::role(Role::Admin));
        assert_eq!(report.decision, AccessDecision::LookupFailed);
        assert!(report.redirect_to.is_none());
        assert!(report.landing.is_none());
    }
}
