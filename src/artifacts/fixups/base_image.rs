use regex::{Captures, Regex};
use std::sync::OnceLock;

/// `FROM [--flag ...] <name> <version> [variant] [AS stage]`
fn malformed_from() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(
            r"(?i)^(\s*)FROM\s+((?:--\S+\s+)*)([A-Za-z][\w./-]*)\s+(\d[\w.\-]*)(?:\s+([A-Za-z][\w.\-]*))??(?:\s+(AS\s+\S+))?\s*$",
        )
        .expect("valid regex")
    })
}

/// Docker Hub image for a language-ish name such as `Node.js` or `Java`
fn known_image(name: &str) -> Option<&'static str> {
    let image = match name.to_lowercase().replace('.', "").as_str() {
        "python" => "python",
        "node" | "nodejs" | "javascript" | "typescript" => "node",
        "go" | "golang" => "golang",
        "ruby" => "ruby",
        "java" | "openjdk" => "openjdk",
        "rust" => "rust",
        "php" => "php",
        _ => return None,
    };
    Some(image)
}

/// Image and tag for a name/version pair; `python3 11` reads as `python:3.11`
fn image_and_tag(name: &str, version: &str) -> (String, String) {
    if let Some(image) = known_image(name) {
        return (image.to_string(), version.to_string());
    }

    let stem = name.trim_end_matches(|c: char| c.is_ascii_digit());
    let major = &name[stem.len()..];
    if let (Some(image), false) = (known_image(stem), major.is_empty()) {
        let tag = if version.starts_with(&format!("{major}.")) || version == major {
            version.to_string()
        } else {
            format!("{major}.{version}")
        };
        return (image.to_string(), tag);
    }

    (name.to_lowercase(), version.to_string())
}

fn rewrite(caps: &Captures<'_>) -> Option<String> {
    let variant = caps.get(5).map(|m| m.as_str());
    if variant.is_some_and(|v| v.eq_ignore_ascii_case("as")) {
        return None;
    }

    let (image, mut tag) = image_and_tag(&caps[3], &caps[4]);
    if let Some(variant) = variant {
        tag.push('-');
        tag.push_str(&variant.to_lowercase());
    }

    let mut fixed = format!("{}FROM {}{}:{}", &caps[1], &caps[2], image, tag);
    if let Some(stage) = caps.get(6) {
        fixed.push(' ');
        fixed.push_str(stage.as_str());
    }
    Some(fixed)
}

/// Rewrites space-separated base images into `FROM <image>:<tag>`, keeping
/// any leading flags and the stage name
pub(super) fn normalize(text: &str) -> String {
    text.split('\n')
        .map(|line| {
            malformed_from()
                .captures(line)
                .and_then(|caps| rewrite(&caps))
                .unwrap_or_else(|| line.to_string())
        })
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_space_separated_versions() {
        assert_eq!(normalize("FROM Python 3.11"), "FROM python:3.11");
        assert_eq!(normalize("FROM Node.js 20-alpine"), "FROM node:20-alpine");
        assert_eq!(normalize("FROM go 1.21 AS builder"), "FROM golang:1.21 AS builder");
        assert_eq!(normalize("from Java 17"), "FROM openjdk:17");
    }

    #[test]
    fn test_hyphenated_image_name() {
        assert_eq!(normalize("FROM eclipse-temurin 17-jre"), "FROM eclipse-temurin:17-jre");
    }

    #[test]
    fn test_platform_flag_is_kept() {
        assert_eq!(
            normalize("FROM --platform=linux/amd64 python 3.11 AS build"),
            "FROM --platform=linux/amd64 python:3.11 AS build"
        );
    }

    #[test]
    fn test_namespaced_image_name() {
        assert_eq!(normalize("FROM library/python 3.11"), "FROM library/python:3.11");
    }

    #[test]
    fn test_major_version_in_name() {
        assert_eq!(normalize("FROM python3 11"), "FROM python:3.11");
        assert_eq!(normalize("FROM python3 3.12"), "FROM python:3.12");
    }

    #[test]
    fn test_trailing_variant_word() {
        assert_eq!(normalize("FROM Python 3.11 slim"), "FROM python:3.11-slim");
        assert_eq!(
            normalize("  FROM node 20 alpine AS deps"),
            "  FROM node:20-alpine AS deps"
        );
    }

    #[test]
    fn test_well_formed_lines_untouched() {
        for line in [
            "FROM python:3.11-slim",
            "FROM node:20 AS build",
            "FROM scratch",
            "FROM ubuntu AS base",
            "FROM --platform=linux/amd64 golang:1.21",
            "FROM ghcr.io/acme/base:2024.1",
        ] {
            assert_eq!(normalize(line), line);
        }
    }

    #[test]
    fn test_idempotent() {
        let once = normalize("FROM Ruby 3.2\nFROM --platform=linux/arm64 eclipse-temurin 21 jre\nRUN bundle install");
        assert_eq!(normalize(&once), once);
        assert!(once.contains("eclipse-temurin:21-jre"));
    }
}
