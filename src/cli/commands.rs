//! Command implementations for the vecfind CLI.

use std::fs;
use std::sync::Arc;

use crate::cli::args::*;
use crate::cli::output::*;
use crate::config::DispatchConfig;
use crate::dispatch::{Dispatcher, MemoryObjectStore, ObjectOutcome};
use crate::error::Result;
use crate::generator::{RecordGenerator, object_names};
use crate::protocol::{MultiRequest, MultiResponse};

/// Execute a CLI command.
pub fn execute_command(args: VecfindArgs) -> Result<()> {
    match &args.command {
        Command::Generate(generate_args) => generate_batch(generate_args, &args),
        Command::Decode(decode_args) => decode_batch(decode_args, &args),
        Command::Format(format_args) => show_format(format_args, &args),
        Command::Simulate(simulate_args) => simulate_round(simulate_args, &args),
    }
}

fn generator(seed: Option<u64>) -> RecordGenerator {
    match seed {
        Some(seed) => RecordGenerator::new(seed),
        None => RecordGenerator::from_entropy(),
    }
}

/// Write a random request batch.
fn generate_batch(args: &GenerateArgs, cli_args: &VecfindArgs) -> Result<()> {
    if cli_args.verbosity() > 1 {
        println!(
            "Generating {} requests of {} (k={})",
            args.requests, args.format, args.k
        );
    }

    let batch = generator(args.seed).random_multi_request(args.requests, args.k, args.format)?;
    let encoded = batch.encode()?;
    fs::write(&args.out, &encoded)?;

    output_result(
        "Request batch written",
        &GenerateResult {
            path: args.out.to_string_lossy().to_string(),
            format: args.format.to_string(),
            requests: batch.len(),
            k: args.k,
            bytes: encoded.len() as u64,
        },
        cli_args,
    )
}

/// Decode a reply or request batch file.
fn decode_batch(args: &DecodeArgs, cli_args: &VecfindArgs) -> Result<()> {
    let bytes = fs::read(&args.input)?;
    if cli_args.verbosity() > 1 {
        println!(
            "Decoding {} ({})",
            args.input.display(),
            format_bytes(bytes.len() as u64)
        );
    }

    if args.request {
        let batch = MultiRequest::decode(&bytes)?;
        let requests = batch
            .requests()
            .iter()
            .map(|request| {
                Ok(RequestView {
                    k: request.num_to_find(),
                    format: request.format().to_string(),
                    record: request.record().view(request.format())?,
                })
            })
            .collect::<Result<Vec<_>>>()?;

        return output_result(
            "Request batch",
            &RequestBatchView {
                count: requests.len(),
                bytes: bytes.len() as u64,
                requests,
            },
            cli_args,
        );
    }

    let reply = MultiResponse::decode(&bytes)?;
    if let Some(expected) = args.expect {
        reply.check_count(expected)?;
    }
    output_result("Reply batch", &reply.to_view()?, cli_args)
}

/// Show a vector format and its encoded header.
fn show_format(args: &FormatArgs, cli_args: &VecfindArgs) -> Result<()> {
    let format = args.format;
    let header = format.to_header_bytes()?;

    output_result(
        "Vector format",
        &FormatResult {
            format: format.to_string(),
            record_size: format.record_size,
            vector_offset: format.vector_offset,
            element_type: format.element_type.to_string(),
            type_code: format.element_type.code(),
            vector_length: format.vector_length,
            vector_bytes: format.vector_bytes(),
            header: hex_bytes(&header),
        },
        cli_args,
    )
}

/// Dispatch one generated batch to in-memory objects that hold no records.
fn simulate_round(args: &SimulateArgs, cli_args: &VecfindArgs) -> Result<()> {
    let config = match &args.config {
        Some(path) => {
            if cli_args.verbosity() > 1 {
                println!("Loading config from: {}", path.display());
            }
            DispatchConfig::from_json_file(path)?
        }
        None => DispatchConfig::default(),
    };

    let store = Arc::new(MemoryObjectStore::new(&config)?);
    let objects = object_names(args.objects);
    for object_id in objects.iter().skip(args.missing) {
        store.insert_handler(
            object_id.clone(),
            MemoryObjectStore::empty_objects_handler(args.format),
        );
    }

    let batch = generator(args.seed).random_multi_request(args.requests, args.k, args.format)?;
    if cli_args.verbosity() > 1 {
        println!(
            "Dispatching {} requests to {} objects ({} missing)",
            batch.len(),
            objects.len(),
            args.missing.min(objects.len())
        );
    }

    let dispatcher = Dispatcher::new(store, config)?;
    let outcome = if args.use_async {
        futures::executor::block_on(dispatcher.find_closest_async(&objects, &batch))?
    } else {
        dispatcher.find_closest(&objects, &batch)?
    };

    let summary = outcome.summary();
    let reports = outcome
        .into_inner()
        .into_iter()
        .map(|(object, outcome)| report(object, outcome))
        .collect();

    output_result(
        "Simulation finished",
        &SimulationResult {
            summary,
            request_bytes: batch.encoded_len(),
            objects: reports,
        },
        cli_args,
    )
}

fn report(object: String, outcome: ObjectOutcome) -> ObjectReport {
    let label = outcome.label().to_string();
    let (return_code, responses, error) = match outcome {
        ObjectOutcome::Succeeded(response) => (None, Some(response.len()), None),
        ObjectOutcome::Empty => (None, None, None),
        ObjectOutcome::Failed(code) => (Some(code), None, None),
        ObjectOutcome::Malformed(e) | ObjectOutcome::NotSubmitted(e) => {
            (None, None, Some(e.to_string()))
        }
    };

    ObjectReport {
        object,
        outcome: label,
        return_code,
        responses,
        error,
    }
}
