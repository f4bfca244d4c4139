use actix_web::{body::BoxBody, http::StatusCode, HttpResponse};
use error_stack::Report;

use super::Error;
use crate::database::{self, ErrorExt2};
use crate::recommend::RecommendError;
use crate::store::StoreError;
use crate::types::{paging::PagingError, Error as ErrorType};

impl actix_web::ResponseError for Error {
  fn status_code(&self) -> StatusCode {
    match self.as_type() {
      ErrorType::Internal => StatusCode::INTERNAL_SERVER_ERROR,
      ErrorType::InvalidRequest => StatusCode::BAD_REQUEST,
      ErrorType::NotFound => StatusCode::NOT_FOUND,
      ErrorType::Unauthorized => StatusCode::UNAUTHORIZED,
      ErrorType::ReadonlyMode | ErrorType::Outage => StatusCode::SERVICE_UNAVAILABLE,
    }
  }

  fn error_response(&self) -> HttpResponse<BoxBody> {
    HttpResponse::build(self.status_code()).json(self.as_type())
  }
}

impl From<Report<database::Error>> for Error {
  #[track_caller]
  fn from(value: Report<database::Error>) -> Self {
    if value.is_readonly() {
      Error::from_report(ErrorType::ReadonlyMode, value)
    } else {
      Error::from_report(ErrorType::Internal, value)
    }
  }
}

impl From<Report<StoreError>> for Error {
  #[track_caller]
  fn from(value: Report<StoreError>) -> Self {
    match value.current_context() {
      StoreError::Readonly => Error::from_report(ErrorType::ReadonlyMode, value),
      StoreError::Failed => Error::from_report(ErrorType::Internal, value),
    }
  }
}

impl From<Report<RecommendError>> for Error {
  #[track_caller]
  fn from(value: Report<RecommendError>) -> Self {
    Error::from_report(ErrorType::Outage, value)
  }
}

impl From<PagingError> for Error {
  #[track_caller]
  fn from(value: PagingError) -> Self {
    Error::from_context(ErrorType::InvalidRequest, value)
  }
}
