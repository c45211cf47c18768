use std::future::Future;
use rand::Rng;
use tracing::warn;
use crate::error::AppError;

const SUFFIX_LENGTH: usize = 8;
const MAX_ATTEMPTS: usize = 10;
const HEX_UPPER: &[u8; 16] = b"0123456789ABCDEF";

/// `PREFIX-XXXXXXXX` with an uppercase hex suffix.
pub fn generate_reference(prefix: &str) -> String {
    let mut rng = rand::thread_rng();
    let suffix: String = (0..SUFFIX_LENGTH)
        .map(|_| HEX_UPPER[rng.gen_range(0..HEX_UPPER.len())] as char)
        .collect();
    format!("{}-{}", prefix, suffix)
}

/// Draws codes until `is_taken` reports a free one.
pub async fn allocate_reference<F, Fut>(prefix: &str, is_taken: F) -> Result<String, AppError>
where
    F: FnMut(String) -> Fut,
    Fut: Future<Output = Result<bool, AppError>>,
{
    allocate_with(|| generate_reference(prefix), is_taken).await
}

async fn allocate_with<G, F, Fut>(mut generate: G, mut is_taken: F) -> Result<String, AppError>
where
    G: FnMut() -> String,
    F: FnMut(String) -> Fut,
    Fut: Future<Output = Result<bool, AppError>>,
{
    for attempt in 1..=MAX_ATTEMPTS {
        let candidate = generate();
        if !is_taken(candidate.clone()).await? {
            return Ok(candidate);
        }
        warn!(attempt, reference = %candidate, "Reference code collision, regenerating");
    }
    Err(AppError::InternalWithMsg(format!(
        "Could not allocate a unique reference code after {} attempts",
        MAX_ATTEMPTS
    )))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;
    use std::future::ready;

    #[test]
    fn test_reference_format() {
        let code = generate_reference("SVC");
        assert_eq!(code.len(), 12);
        assert!(code.starts_with("SVC-"));
        assert!(code[4..].chars().all(|c| c.is_ascii_digit() || ('A'..='F').contains(&c)));
    }

    #[tokio::test]
    async fn test_ten_thousand_codes_never_collide_silently() {
        let mut issued = HashSet::new();
        for _ in 0..10_000 {
            let code = allocate_reference("SVC", |c| ready(Ok(issued.contains(&c)))).await.unwrap();
            assert!(issued.insert(code), "allocator returned an already issued code");
        }
        assert_eq!(issued.len(), 10_000);
    }

    #[tokio::test]
    async fn test_collision_triggers_regeneration() {
        let mut sequence = vec!["SVC-AAAAAAAA", "SVC-AAAAAAAA", "SVC-BBBBBBBB"].into_iter();
        let taken: HashSet<String> = ["SVC-AAAAAAAA".to_string()].into();
        let mut checks = 0;

        let code = allocate_with(
            || sequence.next().unwrap_or("SVC-CCCCCCCC").to_string(),
            |c| {
                checks += 1;
                ready(Ok(taken.contains(&c)))
            },
        )
        .await
        .unwrap();

        assert_eq!(code, "SVC-BBBBBBBB");
        assert_eq!(checks, 3);
    }

    #[tokio::test]
    async fn test_gives_up_when_every_code_is_taken() {
        let result = allocate_with(|| "SVC-00000000".to_string(), |_| ready(Ok(true))).await;
        assert!(matches!(result, Err(AppError::InternalWithMsg(_))));
    }
}
