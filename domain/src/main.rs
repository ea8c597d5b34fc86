use std::env;
use std::process;

use domain::adapters::memory_repo::InMemoryRepo;
use domain::service::VideoService;
use domain::validate::extract_video_id;
use domain::NewVideo;

fn print_usage() {
    eprintln!(
        "{}\n\nUsage:\n  domain extract <url>\n  domain add <name> <url> [--notes <text>]\n\nNotes:\n  - This demo CLI uses an in-memory repository; data is not persisted across runs.",
        domain::about()
    );
}

fn run() -> Result<(), String> {
    let mut args = env::args().skip(1); // skip program name

    let Some(cmd) = args.next() else {
        print_usage();
        return Ok(());
    };

    match cmd.as_str() {
        "extract" => {
            let Some(url) = args.next() else {
                return Err("missing <url> for extract".into());
            };
            match extract_video_id(&url) {
                Ok(id) => {
                    println!("{}", id);
                    Ok(())
                }
                Err(e) => Err(e.to_string()),
            }
        }
        "add" => {
            let (Some(name), Some(url)) = (args.next(), args.next()) else {
                return Err("add requires <name> and <url>".into());
            };

            let mut notes: Option<String> = None;
            let rest: Vec<String> = args.collect();
            let mut i = 0;
            while i < rest.len() {
                match rest[i].as_str() {
                    "--notes" => {
                        if i + 1 >= rest.len() {
                            return Err("--notes requires a value".into());
                        }
                        notes = Some(rest[i + 1].clone());
                        i += 2;
                    }
                    unk => {
                        return Err(format!("unknown argument: {}", unk));
                    }
                }
            }

            let svc = VideoService::new(InMemoryRepo::new());
            match svc.save(NewVideo::new(name, url, notes)) {
                Ok(video) => {
                    println!("added: {}", video);
                    Ok(())
                }
                Err(e) => Err(format!("add failed: {}", e)),
            }
        }
        _ => {
            print_usage();
            Ok(())
        }
    }
}

fn main() {
    if let Err(msg) = run() {
        eprintln!("error: {}", msg);
        process::exit(1);
    }
}
