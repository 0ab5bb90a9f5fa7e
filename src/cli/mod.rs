// ============================================================
// Layer 1 - CLI / Presentation Layer
// ============================================================
// Parses arguments with clap, hands off to Layer 2, and prints
// the results. All business logic lives in the use cases.
//
// Reference: Rust Book §7 (Modules), §12 (CLI programs)

pub mod commands;

use anyhow::Result;
use clap::Parser;
use commands::{Commands, EvaluateArgs, GenerateArgs, InspectArgs, PredictArgs, TrainArgs};

use crate::application::train_use_case::TrainConfig;

#[derive(Parser, Debug)]
#[command(
    name = "muon-ag-classifier",
    version,
    about = "Detect silver (Ag) in material samples from muon spectroscopy spectra with a dense neural network."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

impl Cli {
    pub fn run(self) -> Result<()> {
        match self.command {
            Commands::Inspect(args)  => run_inspect(args),
            Commands::Train(args)    => run_train(args),
            Commands::Evaluate(args) => run_evaluate(args),
            Commands::Predict(args)  => run_predict(args),
            Commands::Generate(args) => run_generate(args),
        }
    }
}

fn run_inspect(args: InspectArgs) -> Result<()> {
    use crate::application::inspect_use_case::InspectUseCase;

    let report = InspectUseCase::new(
        args.data.data.clone(),
        args.data.columns(),
        args.target,
        args.out_dir,
    )
    .execute()?;

    println!("Samples:        {}", report.samples);
    println!("Spectrum bins:  {}", report.spectrum_len);
    println!("\nElement frequencies:");
    for (element, n) in &report.frequencies {
        println!("  {:<4} {:>6}  ({:.1}%)", element, n, *n as f64 * 100.0 / report.samples as f64);
    }

    let c = &report.class_counts;
    println!("\nTarget '{}': {} with, {} without", report.target, c.positive, c.negative);
    println!(
        "Majority-class baseline accuracy: {:.1}%",
        c.baseline_accuracy() * 100.0
    );
    if !c.is_balanced() {
        println!("Classes are imbalanced: consider `train --balance`.");
    }
    for path in &report.plots {
        println!("Wrote {}", path.display());
    }
    Ok(())
}

fn run_train(args: TrainArgs) -> Result<()> {
    use crate::application::train_use_case::TrainUseCase;

    tracing::info!("Starting training on '{}'", args.data.data);

    let config = TrainConfig::try_from(args)?;
    let artifact_dir = config.artifact_dir.clone();
    let report = TrainUseCase::new(config).execute()?;

    let s = &report.summary;
    println!(
        "\nTrained on {} samples, validated on {} ({} epochs{}).",
        report.train_samples,
        report.val_samples,
        s.epochs_run(),
        if s.stopped_early { ", stopped early" } else { "" },
    );
    if let Some(best) = s.best_epoch {
        println!(
            "Best epoch: {}{}",
            best,
            if s.restored_best { " (weights restored)" } else { "" }
        );
    }
    if let Some(last) = s.last() {
        println!(
            "Final accuracy: train {:.1}%{}",
            last.train_acc * 100.0,
            last.val_acc.map_or(String::new(), |v| format!(", validation {:.1}%", v * 100.0)),
        );
    }
    if let Some(baseline) = report.baseline_accuracy() {
        println!("Majority-class baseline: {:.1}%", baseline * 100.0);
    }
    println!("Artifacts saved to '{artifact_dir}'.");
    Ok(())
}

fn run_evaluate(args: EvaluateArgs) -> Result<()> {
    use crate::application::evaluate_use_case::EvaluateUseCase;

    let report = EvaluateUseCase::new(&args.artifact_dir, args.data, args.device)?.evaluate()?;

    println!("Samples: {}", report.samples);
    println!("{:<6} {:>8} {:>9} {:>7} {:>6} {:>5} {:>5} {:>5} {:>5}",
        "label", "accuracy", "precision", "recall", "f1", "tp", "fp", "tn", "fn");
    for l in &report.labels {
        let m = &l.matrix;
        println!("{:<6} {:>7.1}% {:>8.1}% {:>6.1}% {:>6.3} {:>5} {:>5} {:>5} {:>5}",
            l.label,
            m.accuracy() * 100.0,
            m.precision() * 100.0,
            m.recall() * 100.0,
            m.f1(),
            m.tp, m.fp, m.tn, m.fn_,
        );
    }
    println!(
        "\nAccuracy {:.1}% vs majority-class baseline {:.1}%{}",
        report.accuracy() * 100.0,
        report.baseline_accuracy() * 100.0,
        if report.beats_baseline() { "" } else { " (model does not beat the baseline)" },
    );
    Ok(())
}

fn run_predict(args: PredictArgs) -> Result<()> {
    use crate::application::evaluate_use_case::EvaluateUseCase;

    let uc    = EvaluateUseCase::new(&args.artifact_dir, args.data, args.device)?;
    let names = uc.labels().label_names();
    let preds = uc.predict(args.limit)?;

    println!("row\t{}\telements", names.join("\t"));
    for p in &preds {
        let probs: Vec<String> = p.probabilities.iter().map(|v| format!("{v:.4}")).collect();
        println!("{}\t{}\t{}", p.row, probs.join("\t"), p.elements.join(","));
    }
    Ok(())
}

fn run_generate(args: GenerateArgs) -> Result<()> {
    use crate::application::generate_use_case::GenerateUseCase;

    let counts = GenerateUseCase::new(args.out.clone(), (&args).into(), args.seed).execute()?;
    println!(
        "Wrote {} samples ({} with Ag, {:.1}%) to {}",
        counts.total(),
        counts.positive,
        counts.positive_fraction() * 100.0,
        args.out.display()
    );
    Ok(())
}
