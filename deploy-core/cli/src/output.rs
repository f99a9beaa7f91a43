use anyhow::Result;
use deploy_core::executor::{PlannedAction, PlannedStep, StepOutcome};
use deploy_core::{ConstructorArg, DeploymentRecord, Finding, RunReport, VerificationReport};

fn render_args(args: &[ConstructorArg]) -> String {
    let parts: Vec<String> = args.iter().map(ToString::to_string).collect();
    format!("({})", parts.join(", "))
}

pub fn print_plan(steps: &[PlannedStep], json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(steps)?);
        return Ok(());
    }

    for (i, step) in steps.iter().enumerate() {
        let action = match &step.action {
            PlannedAction::Deploy => "deploy".to_string(),
            PlannedAction::Skip { address } => format!("skip      (at {})", address),
            PlannedAction::Redeploy { previous } => format!("redeploy  (was {})", previous),
        };
        let args = match &step.args {
            Some(args) => render_args(args),
            None => "(after dependencies)".to_string(),
        };
        println!("{:>3}. {:<24} {} {}", i + 1, step.name, action, args);
    }
    Ok(())
}

pub fn print_run(report: &RunReport) {
    for step in &report.steps {
        let verb = match step.outcome {
            StepOutcome::Deployed => "deployed",
            StepOutcome::Skipped => "unchanged",
        };
        println!("{:<24} {:<10} {}", step.record.name, verb, step.record.address);
    }

    match &report.failure {
        None => println!(
            "run {}: {} deployed, {} unchanged",
            report.run_id,
            report.deployed_count(),
            report.skipped_count()
        ),
        Some(failure) => {
            println!("{:<24} {:<10} {}", failure.artifact, "FAILED", failure.error);
            if !report.not_attempted.is_empty() {
                println!("not attempted: {}", report.not_attempted.join(", "));
            }
            println!("re-run the same command to resume from {}", failure.artifact);
        }
    }
}

pub fn print_verification(report: &VerificationReport, json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(report)?);
        return Ok(());
    }

    for finding in &report.findings {
        match finding {
            Finding::WiringDrift {
                artifact,
                expected,
                actual,
            } => println!(
                "drift       {}: expected {} but recorded {}",
                artifact,
                render_args(expected),
                render_args(actual)
            ),
            Finding::IncompleteDeployment { artifact, missing } => println!(
                "incomplete  {}: never deployed: {}",
                artifact,
                missing.join(", ")
            ),
            Finding::UnregisteredArtifact { artifact } => {
                println!("orphaned    {}: not in the registry", artifact)
            }
        }
    }
    println!(
        "checked {} records: {} drifted, {} incomplete",
        report.checked,
        report.drift_count(),
        report.incomplete_count()
    );
    Ok(())
}

pub fn print_records(records: &[DeploymentRecord], json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(records)?);
        return Ok(());
    }

    for record in records {
        println!(
            "{} {:<24} {} {}",
            record.timestamp.to_rfc3339(),
            record.name,
            record.address,
            render_args(&record.constructor_args)
        );
    }
    Ok(())
}
