//! `roe classify` – classify status codes.

use roe_core::retry::{classify_http_status, user_message, ErrorClass};

pub fn run_classify(statuses: &[u16]) {
    println!("{:<8} {:<18} {:<10} {}", "STATUS", "KIND", "CLASS", "MESSAGE");
    for &status in statuses {
        let kind = classify_http_status(status);
        let class = match kind.class() {
            ErrorClass::Retryable => "retryable",
            ErrorClass::Terminal => "terminal",
        };
        println!(
            "{:<8} {:<18} {:<10} {}",
            status,
            format!("{:?}", kind),
            class,
            user_message(Some(status))
        );
    }
}
