//! Patch orchestration: decide which configurations to duplicate, apply the
//! textual edit, and prove the result against a structural edit.
use std::collections::BTreeMap;

use serde_yaml::Mapping;
use thiserror::Error;
use tracing::debug;

use crate::context::{generate_context, validate_context};
use crate::model::{self, ModelError, PackagerDocument};
use crate::scalar::DecodeError;
use crate::scanner::{self, EditPlan};

/// One patch operation over one document.
pub struct PatchRequest<'a> {
    pub old_platform: &'a str,
    pub new_platform: &'a str,
    /// Treat documents without a configuration for the old platform, and
    /// modulemd-v2 documents, as skippable instead of failing.
    pub skip_unsuitable: bool,
}

/// Successful verdicts. Rejections are `PatchError`s.
#[derive(Debug)]
pub enum Outcome {
    /// The patched document text.
    Applied(String),
    /// The document needs no editing; the reason is reported to the user.
    Skipped(String),
}

#[derive(Debug, Error)]
pub enum PatchError {
    #[error("unable to parse a modulemd-packager document")]
    Parse(#[source] ModelError),
    #[error("this is a modulemd-v2 document")]
    ModulemdV2,
    #[error("no context with the old platform {0}")]
    NoOldPlatform(String),
    #[error("malformed scalar")]
    Decode(#[from] DecodeError),
    #[error("unable to parse the edited document")]
    Reparse(#[source] ModelError),
    #[error("unable to compare the edited documents")]
    Compare(#[from] serde_yaml::Error),
    #[error("editing would damage the modulemd-packager document")]
    WouldDamage,
}

/// Add a configuration for the new platform to the document string.
///
/// The text is never modified in place; on success the patched text comes
/// back in `Outcome::Applied`. Re-running over an already patched document
/// yields `Outcome::Skipped`, so the operation is idempotent.
pub fn process_string(
    content: &str,
    request: &PatchRequest<'_>,
) -> Result<Outcome, PatchError> {
    let mut document = match PackagerDocument::parse(content) {
        Ok(document) => document,
        Err(ModelError::ModulemdV2) if request.skip_unsuitable => {
            return Ok(Outcome::Skipped("this is a modulemd-v2 document".to_string()));
        }
        Err(ModelError::ModulemdV2) => return Err(PatchError::ModulemdV2),
        Err(error) => return Err(PatchError::Parse(error)),
    };

    // Enumerate configurations, bailing out early when the new platform is
    // already covered.
    let mut contexts = document.contexts();
    let mut templates: Vec<(String, Mapping)> = Vec::new();
    for config in document.build_configs() {
        let Some(context) = model::config_context(config) else {
            continue;
        };
        let platform = model::config_platform(config);
        if platform.as_deref() == Some(request.new_platform) {
            return Ok(Outcome::Skipped(format!(
                "a context for the new platform {} already exists: {}",
                request.new_platform, context
            )));
        }
        if platform.as_deref() == Some(request.old_platform) {
            templates.push((context, config.clone()));
        }
    }

    if templates.is_empty() {
        let reason = format!("no context with the old platform {}", request.old_platform);
        return if request.skip_unsuitable {
            Ok(Outcome::Skipped(reason))
        } else {
            Err(PatchError::NoOldPlatform(request.old_platform.to_string()))
        };
    }
    debug!("{} template configuration(s)", templates.len());

    // Allocate a context per template and duplicate each configuration in
    // the structural model. With a single template the new platform itself
    // is the preferred context, when it is free and well-formed.
    let single_template = templates.len() == 1;
    let mut context_map: BTreeMap<String, String> = BTreeMap::new();
    for (template_context, template) in &templates {
        let new_context = if single_template
            && !contexts.iter().any(|taken| taken == request.new_platform)
            && validate_context(request.new_platform)
        {
            request.new_platform.to_string()
        } else {
            generate_context(&contexts)
        };
        debug!("duplicating context {template_context:?} as {new_context:?}");
        document.add_build_config(model::duplicate_config(
            template,
            &new_context,
            request.new_platform,
        ));
        contexts.push(new_context.clone());
        context_map.insert(template_context.clone(), new_context);
    }

    // The same edit again, textually, preserving formatting.
    let plan = EditPlan {
        old_platform: request.old_platform,
        new_platform: request.new_platform,
        context_map: &context_map,
    };
    let edited = scanner::apply(content, &plan)?;

    // Reparse the edited text and require agreement with the structural
    // edit before anything is handed back.
    let edited_document = PackagerDocument::parse(&edited).map_err(PatchError::Reparse)?;
    if !model::equivalent(&document, &edited_document)? {
        return Err(PatchError::WouldDamage);
    }
    Ok(Outcome::Applied(edited))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request<'a>(old: &'a str, new: &'a str) -> PatchRequest<'a> {
        PatchRequest {
            old_platform: old,
            new_platform: new,
            skip_unsuitable: false,
        }
    }

    fn skipping<'a>(old: &'a str, new: &'a str) -> PatchRequest<'a> {
        PatchRequest {
            old_platform: old,
            new_platform: new,
            skip_unsuitable: true,
        }
    }

    fn applied(content: &str, request: &PatchRequest<'_>) -> String {
        match process_string(content, request).expect("process") {
            Outcome::Applied(text) => text,
            Outcome::Skipped(reason) => panic!("unexpected skip: {reason}"),
        }
    }

    fn skipped(content: &str, request: &PatchRequest<'_>) -> String {
        match process_string(content, request).expect("process") {
            Outcome::Skipped(reason) => reason,
            Outcome::Applied(_) => panic!("unexpected edit"),
        }
    }

    const MODULEMD_V2: &str = "
document: modulemd
version: 2
data:
    summary: text
    description: text
    license:
        module: [MIT]
    dependencies:
        - buildrequires:
            platform: []
          requires:
            platform: []
";

    #[test]
    fn duplicates_the_configuration_for_the_old_platform() {
        let input = "
document: modulemd-packager
version: 3
data:
# Many spaces
    configurations :
        # Comment A
    - context: 'A'
         # Inter comment
      platform: f34
       # Trailing comment
    - context: 'B'
      platform: f35
";
        let expected = "
document: modulemd-packager
version: 3
data:
# Many spaces
    configurations :
        # Comment A
    - context: 'A'
         # Inter comment
      platform: f34
       # Trailing comment
    - context: 'B'
      platform: f35
    - context: 'f36'
      platform: f36
";
        assert_eq!(applied(input, &request("f35", "f36")), expected);
    }

    #[test]
    fn duplicates_an_entry_ending_on_the_last_line() {
        let input = "
document: modulemd-packager
version: 3
data:
    configurations:
    - context: 'A'
      platform: A
";
        let expected = "
document: modulemd-packager
version: 3
data:
    configurations:
    - context: 'A'
      platform: A
    - context: 'B'
      platform: B
";
        assert_eq!(applied(input, &request("A", "B")), expected);
    }

    #[test]
    fn preserves_a_missing_final_newline() {
        let input = "
document: modulemd-packager
version: 3
data:
    configurations:
    - context: 'A'
      platform: A";
        let expected = "
document: modulemd-packager
version: 3
data:
    configurations:
    - context: 'A'
      platform: A
    - context: 'B'
      platform: B";
        assert_eq!(applied(input, &request("A", "B")), expected);
    }

    #[test]
    fn carries_suffix_comments_into_the_duplicate() {
        let input = "
document: modulemd-packager
version: 3
data:
    configurations:
    - context: 'A' # Context suffix comment
      platform: A  # Platform suffix comment
";
        let expected = "
document: modulemd-packager
version: 3
data:
    configurations:
    - context: 'A' # Context suffix comment
      platform: A  # Platform suffix comment
    - context: 'X' # Context suffix comment
      platform: X  # Platform suffix comment
";
        assert_eq!(applied(input, &request("A", "X")), expected);
    }

    #[test]
    fn falls_back_to_a_generated_context_on_collision() {
        let input = "
document: modulemd-packager
version: 3
data:
    configurations:
    - context: 'A'
      platform: A
    - context: 'B'
      platform: C
";
        let expected = "
document: modulemd-packager
version: 3
data:
    configurations:
    - context: 'A'
      platform: A
    - context: '0'
      platform: B
    - context: 'B'
      platform: C
";
        assert_eq!(applied(input, &request("A", "B")), expected);
    }

    #[test]
    fn duplicates_every_template_with_generated_contexts() {
        let input = "
document: modulemd-packager
version: 3
data:
    configurations:
    - context: 'A'
      platform: A
    - context: 'B'
      platform: A
";
        let expected = "
document: modulemd-packager
version: 3
data:
    configurations:
    - context: 'A'
      platform: A
    - context: '0'
      platform: B
    - context: 'B'
      platform: A
    - context: '1'
      platform: B
";
        assert_eq!(applied(input, &request("A", "B")), expected);
    }

    #[test]
    fn generates_a_context_when_the_new_platform_is_not_a_valid_one() {
        let input = "
document: modulemd-packager
version: 3
data:
    configurations:
    - context: 'A'
      platform: A
";
        let expected = "
document: modulemd-packager
version: 3
data:
    configurations:
    - context: 'A'
      platform: A
    - context: '0'
      platform: 1.2
";
        assert_eq!(applied(input, &request("A", "1.2")), expected);
    }

    #[test]
    fn nested_configuration_fields_survive_verification() {
        let input = "
document: modulemd-packager
version: 3
data:
    configurations:
        - context: 'A'
          platform: A
          buildrequires:
              foo: [bar]
";
        let expected = "
document: modulemd-packager
version: 3
data:
    configurations:
        - context: 'A'
          platform: A
          buildrequires:
              foo: [bar]
        - context: 'B'
          platform: B
          buildrequires:
              foo: [bar]
";
        assert_eq!(applied(input, &request("A", "B")), expected);
    }

    #[test]
    fn quote_styles_carry_over_to_the_duplicate() {
        for (context, platform, new_context, new_platform) in [
            ("A", "A", "B", "B"),
            ("'A'", "'A'", "'B'", "'B'"),
            ("\"A\"", "\"\\x41\"", "\"B\"", "\"B\""),
        ] {
            let input = format!(
                "
document: modulemd-packager
version: 3
data:
    configurations:
    - context: {context}
      platform: {platform}
"
            );
            let expected = format!(
                "
document: modulemd-packager
version: 3
data:
    configurations:
    - context: {context}
      platform: {platform}
    - context: {new_context}
      platform: {new_platform}
"
            );
            assert_eq!(applied(&input, &request("A", "B")), expected);
        }
    }

    #[test]
    fn skips_when_the_new_platform_already_exists() {
        let input = "
document: modulemd-packager
version: 3
data:
    configurations:
    - context: 'A'
      platform: 'A'
    - context: 'B'
      platform: 'B'
";
        let reason = skipped(input, &request("B", "B"));
        assert!(reason.contains("already exists"), "reason: {reason}");
    }

    #[test]
    fn rejects_without_a_template_unless_skipping() {
        let input = "
document: modulemd-packager
version: 3
data:
    configurations:
    - context: 'A'
      platform: 'A'
";
        let error = process_string(input, &request("f35", "f36")).expect_err("must fail");
        assert!(matches!(error, PatchError::NoOldPlatform(_)));

        let reason = skipped(input, &skipping("f35", "f36"));
        assert!(reason.contains("no context"), "reason: {reason}");
    }

    #[test]
    fn rejects_a_modulemd_v2_document_unless_skipping() {
        let error = process_string(MODULEMD_V2, &request("f35", "f36")).expect_err("must fail");
        assert!(matches!(error, PatchError::ModulemdV2));

        let reason = skipped(MODULEMD_V2, &skipping("f35", "f36"));
        assert!(reason.contains("modulemd-v2"), "reason: {reason}");
    }

    #[test]
    fn rejects_an_invalid_document_even_when_skipping() {
        let input = "
document: gibberish
version: 3
data:
";
        assert!(matches!(
            process_string(input, &request("f35", "f36")),
            Err(PatchError::Parse(_))
        ));
        assert!(matches!(
            process_string(input, &skipping("f35", "f36")),
            Err(PatchError::Parse(_))
        ));
    }

    #[test]
    fn a_second_run_is_idempotent() {
        let input = "
document: modulemd-packager
version: 3
data:
    configurations:
    - context: 'A'
      platform: A
";
        let first = applied(input, &request("A", "B"));
        let reason = skipped(&first, &request("A", "B"));
        assert!(reason.contains("already exists"), "reason: {reason}");
    }

    #[test]
    fn untouched_lines_survive_byte_for_byte() {
        let input = "
document: modulemd-packager
version: 3
data:
# Many spaces
    configurations :
        # Comment A
    - context: 'A'
      platform: f34
    - context: 'B'
      platform: f35
";
        let output = applied(input, &request("f35", "f36"));
        for line in input.split('\n') {
            assert!(
                output.split('\n').any(|candidate| candidate == line),
                "line {line:?} lost"
            );
        }
    }
}
