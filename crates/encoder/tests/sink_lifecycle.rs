//! Drives `FrameSink` against small shell scripts standing in for the encoder.
//!
//! Scripts are run through `sh` rather than executed directly, so a script
//! file written by one test can never be "text file busy" for another.

use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use framepipe_common::error::FramepipeError;
use framepipe_encoder::{EncoderCommand, FrameSink};

fn scratch_dir(name: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(format!(
        "framepipe_test_sink_{name}_{}",
        std::process::id()
    ));
    let _ = std::fs::remove_dir_all(&dir);
    std::fs::create_dir_all(&dir).unwrap();
    dir
}

fn script_command(dir: &Path, body: &str, output: &Path) -> EncoderCommand {
    let script = dir.join("encoder.sh");
    std::fs::write(&script, format!("#!/bin/sh\n{body}\n")).unwrap();
    EncoderCommand {
        program: "sh".to_string(),
        args: vec![
            script.to_string_lossy().into_owned(),
            output.to_string_lossy().into_owned(),
        ],
    }
}

/// Copies stdin to the last argument, like an encoder writing its output.
const CAT_TO_OUTPUT: &str = "for last; do :; done\ncat > \"$last\"";

#[test]
fn every_byte_reaches_the_encoder() {
    let dir = scratch_dir("every_byte");
    let output = dir.join("out.raw");
    let command = script_command(&dir, CAT_TO_OUTPUT, &output);

    let mut sink = FrameSink::spawn(&command, 1024).unwrap();
    let frame = vec![0xABu8; 3000];
    for _ in 0..5 {
        sink.write_frame(&frame).unwrap();
    }
    assert_eq!(sink.frames_written(), 5);
    assert_eq!(sink.bytes_written(), 15_000);

    let exit = sink.wait().unwrap();
    assert!(exit.success());
    let written = std::fs::read(&output).unwrap();
    assert_eq!(written.len(), 15_000);
    assert!(written.iter().all(|&b| b == 0xAB));

    std::fs::remove_dir_all(&dir).ok();
}

#[test]
fn frames_larger_than_the_pipe_buffer_are_written_whole() {
    let dir = scratch_dir("large_frames");
    let output = dir.join("out.raw");
    let command = script_command(&dir, CAT_TO_OUTPUT, &output);

    let mut sink = FrameSink::spawn(&command, 1024).unwrap();
    let frame: Vec<u8> = (0..512 * 512 * 4).map(|i| (i % 251) as u8).collect();
    sink.write_frame(&frame).unwrap();
    sink.write_frame(&frame).unwrap();
    sink.wait().unwrap().into_result().unwrap();

    let written = std::fs::read(&output).unwrap();
    assert_eq!(written.len(), frame.len() * 2);
    assert_eq!(&written[..frame.len()], frame.as_slice());

    std::fs::remove_dir_all(&dir).ok();
}

#[test]
fn closing_never_waits_for_the_encoder_to_drain() {
    let dir = scratch_dir("close_nonblocking");
    let output = dir.join("out.raw");
    let command = script_command(&dir, &format!("sleep 1\n{CAT_TO_OUTPUT}"), &output);

    let mut sink = FrameSink::spawn(&command, 1024).unwrap();
    sink.write_frame(&[7u8; 8192]).unwrap();

    let started = Instant::now();
    assert!(sink.close());
    assert!(!sink.close(), "second close is a no-op");
    assert!(started.elapsed() < Duration::from_millis(500));
    assert!(!sink.is_open());

    sink.wait().unwrap().into_result().unwrap();
    assert_eq!(std::fs::read(&output).unwrap().len(), 8192);

    std::fs::remove_dir_all(&dir).ok();
}

#[test]
fn empty_stream_still_lets_the_encoder_finish() {
    let dir = scratch_dir("empty_stream");
    let output = dir.join("out.raw");
    let command = script_command(&dir, CAT_TO_OUTPUT, &output);

    let mut sink = FrameSink::spawn(&command, 1024).unwrap();
    let exit = sink.wait().unwrap();
    assert!(exit.success());
    assert_eq!(std::fs::read(&output).unwrap().len(), 0);

    std::fs::remove_dir_all(&dir).ok();
}

#[test]
fn early_encoder_failure_breaks_the_pipe_and_reports_status() {
    let dir = scratch_dir("early_failure");
    let output = dir.join("out.raw");
    let command = script_command(&dir, "echo 'unsupported pixel format' >&2\nexit 3", &output);

    let mut sink = FrameSink::spawn(&command, 1024).unwrap();
    let frame = vec![0u8; 256 * 1024];
    let mut write_error = None;
    for _ in 0..64 {
        if let Err(err) = sink.write_frame(&frame) {
            write_error = Some(err);
            break;
        }
    }
    assert!(
        matches!(write_error, Some(FramepipeError::Write { .. })),
        "writing 16 MiB into an exited encoder must fail"
    );

    let err = sink.wait().unwrap().into_result().unwrap_err();
    match err {
        FramepipeError::EncoderExit { code, stderr } => {
            assert_eq!(code, Some(3));
            assert!(stderr.contains("unsupported pixel format"));
        }
        other => panic!("expected EncoderExit, got {other:?}"),
    }

    std::fs::remove_dir_all(&dir).ok();
}

#[test]
fn write_after_close_is_a_write_error() {
    let dir = scratch_dir("write_after_close");
    let output = dir.join("out.raw");
    let command = script_command(&dir, CAT_TO_OUTPUT, &output);

    let mut sink = FrameSink::spawn(&command, 1024).unwrap();
    sink.close();
    let err = sink.write_frame(&[1, 2, 3, 4]).unwrap_err();
    assert!(matches!(err, FramepipeError::Write { frame: 0, .. }));
    sink.wait().unwrap();

    std::fs::remove_dir_all(&dir).ok();
}

#[test]
fn missing_encoder_is_a_spawn_error() {
    let command = EncoderCommand {
        program: "/nonexistent/framepipe/encoder".to_string(),
        args: Vec::new(),
    };
    let err = FrameSink::spawn(&command, 1024).unwrap_err();
    match err {
        FramepipeError::EncoderSpawn { program, .. } => {
            assert_eq!(program, "/nonexistent/framepipe/encoder");
        }
        other => panic!("expected EncoderSpawn, got {other:?}"),
    }
}

#[test]
fn terminate_kills_an_encoder_that_stopped_reading() {
    let dir = scratch_dir("terminate");
    let output = dir.join("out.raw");
    let command = script_command(&dir, "exec sleep 30", &output);

    let mut sink = FrameSink::spawn(&command, 1024).unwrap();
    let started = Instant::now();
    let exit = sink.terminate().unwrap();
    assert!(!exit.success());
    assert!(started.elapsed() < Duration::from_secs(10));
    assert!(sink.encoder_pid().is_none());

    // Waiting again returns the recorded exit instead of failing.
    assert!(!sink.wait().unwrap().success());

    std::fs::remove_dir_all(&dir).ok();
}

#[test]
fn stderr_tail_is_bounded() {
    let dir = scratch_dir("stderr_tail");
    let output = dir.join("out.raw");
    let body = "i=0\nwhile [ $i -lt 2000 ]; do echo \"line $i\" >&2; i=$((i+1)); done\necho final-line >&2\nexit 1";
    let command = script_command(&dir, body, &output);

    let mut sink = FrameSink::spawn(&command, 64).unwrap();
    let exit = sink.wait().unwrap();
    assert!(exit.stderr.len() <= 64);
    assert!(exit.stderr.trim_end().ends_with("final-line"));

    std::fs::remove_dir_all(&dir).ok();
}

/// Process group field of a `/proc/<pid>/stat` line.
#[cfg(target_os = "linux")]
fn pgrp_of(stat: &str) -> u32 {
    let after_comm = &stat[stat.rfind(')').unwrap() + 1..];
    after_comm.split_whitespace().nth(2).unwrap().parse().unwrap()
}

#[cfg(target_os = "linux")]
#[test]
fn encoder_runs_in_its_own_process_group() {
    let dir = scratch_dir("process_group");
    let output = dir.join("stat.txt");
    let command = script_command(
        &dir,
        "for last; do :; done\ncat /proc/self/stat > \"$last\"",
        &output,
    );

    let mut sink = FrameSink::spawn(&command, 1024).unwrap();
    let encoder_pid = sink.encoder_pid().unwrap();
    sink.close();
    assert!(sink.wait().unwrap().success());

    let encoder_pgrp = pgrp_of(&std::fs::read_to_string(&output).unwrap());
    let parent_pgrp = pgrp_of(&std::fs::read_to_string("/proc/self/stat").unwrap());
    assert_eq!(encoder_pgrp, encoder_pid);
    assert_ne!(encoder_pgrp, parent_pgrp);

    std::fs::remove_dir_all(&dir).ok();
}
