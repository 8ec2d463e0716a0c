use awarects_session::TestCase;
use awarects_sim::SimFaults;

use crate::cmd::VersionArgs;
use crate::exit::{CliResult, SUCCESS};

pub fn run(args: VersionArgs) -> CliResult<i32> {
    if !args.extended {
        println!("awarects {}", env!("CARGO_PKG_VERSION"));
        return Ok(SUCCESS);
    }

    println!("name: awarects");
    println!("version: {}", env!("CARGO_PKG_VERSION"));
    println!(
        "target: {}",
        option_env!("AWARECTS_BUILD_TARGET").unwrap_or("unknown")
    );
    println!(
        "profile: {}",
        option_env!("AWARECTS_BUILD_PROFILE").unwrap_or("unknown")
    );
    println!(
        "features: session={}, schema={}, sim={}, cli=true",
        cfg!(feature = "session"),
        cfg!(feature = "schema"),
        cfg!(feature = "sim")
    );
    let cases: Vec<_> = TestCase::ALL.iter().map(|case| case.name()).collect();
    println!("cases: {}", cases.join(", "));
    println!("faults: {}", SimFaults::NAMES.join(", "));

    Ok(SUCCESS)
}
