mod health_check;
mod unsubscribe;
