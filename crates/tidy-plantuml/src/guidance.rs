//! Instructions for callers that drive the iteration loop themselves.
//!
//! An agent that revises diagrams turn by turn cannot use
//! [`IterationSession`](crate::IterationSession) directly; this text walks it
//! through the same protocol using the URL and download operations.

use std::path::Path;

use crate::consts::{DEFAULT_MAX_ATTEMPTS, DEFAULT_MIN_BYTES, SCRATCH_FILE_NAME};

/// Limits quoted in the guidance text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GuidancePolicy {
    /// Attempt budget.
    pub max_attempts: u32,
    /// Minimum plausible artifact size in bytes (`0` omits the size check).
    pub min_bytes: usize,
}

impl Default for GuidancePolicy {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            min_bytes: DEFAULT_MIN_BYTES,
        }
    }
}

/// Build the guidance text for generating a diagram from `description`.
///
/// `scratch_dir` is where the caller should save downloaded artifacts.
#[must_use]
pub fn iteration_guidance(description: &str, scratch_dir: &Path, policy: GuidancePolicy) -> String {
    let scratch_file = scratch_dir.join(SCRATCH_FILE_NAME);
    let scratch_file = scratch_file.display();
    let max_attempts = policy.max_attempts.max(1);
    let size_check = if policy.min_bytes > 0 {
        format!(
            "- Treat files under {} bytes as suspicious for anything beyond a trivial diagram\n",
            policy.min_bytes
        )
    } else {
        String::new()
    };

    format!(
        "\
You are generating a PlantUML diagram from the following description:
---
{description}
---

## Process
Repeat these steps until the diagram renders cleanly:

1. **Write PlantUML**: produce simple, valid PlantUML for the description.
2. **Build the URL**: call the render URL operation with the PlantUML text.
3. **Download**: call the download operation with that URL. Redirects (301/302)
   are followed automatically.
4. **Validate**: read the downloaded file and check it for errors.
5. **Revise**: if validation fails, fix the PlantUML and start again at step 2.

## Writing PlantUML
- Keep diagrams small and focused on the description
- Stick to core syntax: participants, actors, rectangles, arrows, notes
- Avoid deeply nested structures; they are the usual source of parse errors
- Give every element a clear label and the diagram a title

## Downloading
- Save the artifact to `{scratch_file}`
- A missing or zero-byte file means the download failed; check the URL

## Validating
- The server reports syntax errors inside the image, not as an HTTP error
- Search the file for error text such as \"Syntax Error\"
- Confirm the file contains diagram elements, not only an error message
{size_check}
## Retry budget
- Make at most {max_attempts} attempts in total
- On a syntax error: simplify the PlantUML around the reported line
- On a download failure: verify the URL and try again
- When the budget is spent, stop and report the last error and file content

## Result
When the diagram is valid, report:
- The final render URL
- Where the file was saved
- A short description of the diagram
- Anything learned while fixing errors
"
    )
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use super::*;

    #[test]
    fn test_guidance_embeds_description_and_scratch_path() {
        let text = iteration_guidance(
            "Login sequence between user and auth service",
            &PathBuf::from("/scratch"),
            GuidancePolicy::default(),
        );

        assert!(text.contains("Login sequence between user and auth service"));
        assert!(text.contains("/scratch/tmp-puml.svg"));
        assert!(text.contains("at most 3 attempts"));
        assert!(text.contains("under 1000 bytes"));
    }

    #[test]
    fn test_guidance_follows_policy() {
        let text = iteration_guidance(
            "A",
            Path::new("/tmp"),
            GuidancePolicy {
                max_attempts: 5,
                min_bytes: 0,
            },
        );

        assert!(text.contains("at most 5 attempts"));
        assert!(!text.contains("bytes as suspicious"));
    }

    #[test]
    fn test_guidance_lists_protocol_steps_in_order() {
        let text = iteration_guidance("A", Path::new("/tmp"), GuidancePolicy::default());
        let positions: Vec<_> = ["Write PlantUML", "Build the URL", "Download", "Validate", "Revise"]
            .iter()
            .map(|step| text.find(step).unwrap())
            .collect();

        assert!(positions.windows(2).all(|w| w[0] < w[1]));
    }
}
