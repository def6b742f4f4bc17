use std::process::Command;

use anyhow::{Context, Result};

/// `None` means the crate's default features.
const FEATURE_COMBINATIONS: &[Option<&[&str]>] = &[
    None,
    Some(&[]),
    Some(&["foundation"]),
    Some(&["test-utils"]),
];

/// Check that every `slotwise-common` feature tier compiles on its own.
pub fn test_feature_matrix() -> Result<()> {
    println!("Testing {} slotwise-common feature combinations...", FEATURE_COMBINATIONS.len());

    for (index, features) in FEATURE_COMBINATIONS.iter().enumerate() {
        let display_label = match features {
            None => "default".to_string(),
            Some([]) => "none".to_string(),
            Some(list) => list.join(","),
        };

        let mut command = Command::new("cargo");
        command.arg("check").arg("-p").arg("slotwise-common");
        if let Some(list) = features {
            command.arg("--no-default-features");
            if !list.is_empty() {
                command.arg("--features").arg(list.join(","));
            }
        }

        println!("\n[{}/{}] cargo check -p slotwise-common ({display_label})", index + 1, FEATURE_COMBINATIONS.len());

        let status = command
            .status()
            .with_context(|| format!("Failed to run cargo check for '{display_label}'"))?;

        if !status.success() {
            anyhow::bail!("Feature combination '{display_label}' failed to compile");
        }

        println!("✅ Features '{display_label}' compiled successfully");
    }

    println!("\n✅ All {} feature combinations compile successfully!", FEATURE_COMBINATIONS.len());

    Ok(())
}
