#![no_main]

use libfuzzer_sys::fuzz_target;

use uagate::config::{PolicyParams, split_patterns};
use uagate::policy::compile::compile_policy;
use uagate::policy::matcher::evaluate;

fuzz_target!(|data: &[u8]| {
    if data.len() < 2 {
        return;
    }

    // First two bytes pick where the deny list, allow list and User-Agent split.
    let payload = &data[2..];
    let first = (data[0] as usize) % (payload.len() + 1);
    let (denies, rest) = payload.split_at(first);
    let second = (data[1] as usize) % (rest.len() + 1);
    let (allows, agent) = rest.split_at(second);

    let params = PolicyParams {
        denies: split_patterns(&String::from_utf8_lossy(denies)),
        allows: split_patterns(&String::from_utf8_lossy(allows)),
        redirect_page: None,
    };
    let Ok(config) = compile_policy(&params) else {
        return;
    };

    let agent = String::from_utf8_lossy(agent);
    let decision = evaluate(Some(agent.as_ref()), &config, "/");
    if config.deny_patterns().iter().any(|p| p.matches(&agent)) {
        assert!(!decision.is_allow());
    }
    assert!(!evaluate(None, &config, "/").is_allow());
});
