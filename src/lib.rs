/*!
# Campus Hub

A resource sharing platform for students, built in Rust.

## Overview

Students publish study material (notes, previous year question papers,
assignments and projects), browse and review what others shared, and earn
points for contributing. Admins curate featured resources and see
platform-wide statistics. All state lives in a directory of JSON documents.

## Architecture

### Web Layer
- **Technologies**: axum, cookie sessions
- Routing, authentication middleware and request logging (`app`)
- Multipart uploads, PDF downloads, CSV/XLSX leaderboard exports

### Domain Layer
- **Hub** - Owns the state and implements every user action (`store`)
- **Access rules** - Privacy and admin checks (`access`)
- **Derived statistics** - Ratings, leaderboard, badges, progress and
  recommendations (`stats`)
- **Catalog** - Filtering, sorting and pagination (`catalog`)
- **Planner** - Exam study plans and resource summaries (`planner`)

### Data Persistence Layer
- One JSON document per collection, seeded with demo data when missing
- Gzip compressed bincode snapshots for admin export/import

## Modules

- **models**: Users, resources, reviews and history records
- **error**: Error type shared by every operation
- **access**: Who may see and manage a resource
- **stats**: Pure functions computing derived views
- **catalog**: Browse filters and pagination
- **login**: Registration, credentials and sessions
- **store**: The `Hub` holding the application state
- **planner**: Study plan generation and summaries
- **seed**: Demo users, resources and reviews
- **saving**: JSON documents and snapshots
- **downloader**: PDF rendering and CSV/XLSX exports
- **config**: Server configuration
- **app**: Routing and middleware

## REST API Endpoints

- `/api/auth/register`, `/api/auth/login`, `/api/auth/logout` - Sessions
- `/api/auth/password-strength` - Score a candidate password
- `/api/me` - Profile, badges, progress and recommendations
- `/api/resources` - Browse and upload
- `/api/resources/grouped` - The same browse grouped by subject
- `/api/resources/{id}` - Detail, delete, featured toggle, reviews, download
- `/api/leaderboard` - Ranking with `.csv` and `.xlsx` exports
- `/api/planner` - Study plan for an exam
- `/api/admin/...` - Statistics, resource CSV, snapshot export and import
*/

pub mod access;
pub mod catalog;
pub mod config;
pub mod downloader;
pub mod error;
pub mod login;
pub mod models;
pub mod planner;
pub mod saving;
pub mod seed;
pub mod stats;
pub mod store;

#[cfg(feature = "web")]
pub mod app;

pub use error::{HubError, Result};
pub use store::{Hub, HubState};
